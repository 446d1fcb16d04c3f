//! # opencloud-core
//!
//! Data model shared by the OpenCloud provider crates: resource kinds and
//! their status vocabularies, typed desired-state descriptors, observed
//! remote state, tag sets with the tag reconciler, timeouts and the error
//! taxonomy.

pub mod descriptor;
pub mod error;
pub mod id;
pub mod kind;
pub mod observed;
pub mod tags;
pub mod timeouts;

pub use descriptor::{
    FieldChange, ImageDescriptor, KeyDescriptor, ResourceDescriptor, StackDescriptor, Visibility,
};
pub use error::{ClientError, ErrorCategory, ProviderError, ProviderResult};
pub use id::generate_id;
pub use kind::{ResourceKind, ResourceStatus, StatusClass, StatusPolicy};
pub use observed::{
    ImageDetails, KeyDetails, ObservedDetails, ObservedState, StackDetails, StackResource,
};
pub use tags::{TagDelta, TagSet, diff as diff_tags};
pub use timeouts::Timeouts;
