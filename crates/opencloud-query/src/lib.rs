//! # opencloud-query
//!
//! Candidate filtering and the read-only data sources built on it.
//!
//! [`select`] narrows a candidate list down to exactly one object:
//!
//! 1. exact name and visibility match
//! 2. tag membership
//! 3. inclusive size bounds
//! 4. disambiguation (`most_recent`, then smallest id)
//!
//! The data sources ([`lookup_image`], [`lookup_stack_resource`],
//! [`lookup_data_key`]) fetch candidates through a
//! [`CloudClient`](opencloud_client::CloudClient) and resolve them the same way.

pub mod criteria;
pub mod select;
pub mod sources;

pub use criteria::FilterCriteria;
pub use select::{filter, select};
pub use sources::{
    DATA_KEY_MAX_BITS, DATA_KEY_MIN_BITS, StackResourceMatch, lookup_data_key, lookup_image,
    lookup_stack_resource,
};
