//! # opencloud-client
//!
//! Capability trait for the remote cloud API.
//!
//! This crate defines the contract a backend must implement. It does not
//! contain any implementation; the in-memory backend lives in
//! `opencloud-client-memory`, HTTP backends live outside this workspace.
//!
//! ## Implementing a backend
//!
//! ```ignore
//! use async_trait::async_trait;
//! use opencloud_client::{CloudClient, CreateAccepted};
//!
//! struct ImageServiceClient {
//!     // ...
//! }
//!
//! #[async_trait]
//! impl CloudClient for ImageServiceClient {
//!     async fn create(&self, descriptor: &ResourceDescriptor) -> Result<CreateAccepted, ClientError> {
//!         // POST /v2/images
//!     }
//!     // ... other methods
//! }
//! ```

mod traits;
mod types;

pub use traits::CloudClient;
pub use types::{CreateAccepted, DataKey, ListHints};

/// Type alias for a shareable client trait object.
pub type DynClient = std::sync::Arc<dyn CloudClient>;
