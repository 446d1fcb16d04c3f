//! The cloud API capability trait.
//!
//! Authentication, TLS, endpoint discovery and transport retries all live
//! behind an implementation of [`CloudClient`]. The reconciliation core only
//! sees typed descriptors in and typed observations out.

use async_trait::async_trait;
use opencloud_core::{
    ClientError, FieldChange, ObservedState, ResourceDescriptor, ResourceKind, ResourceStatus,
    TagDelta,
};

use crate::types::{CreateAccepted, DataKey, ListHints};

/// Operations a cloud API backend must provide.
///
/// Implementations must be thread-safe (`Send + Sync`); invocations for
/// different resources may run concurrently.
///
/// # Example
///
/// ```ignore
/// use opencloud_client::CloudClient;
///
/// async fn image_status(client: &dyn CloudClient, id: &str) -> Result<String, ClientError> {
///     let observed = client.get(ResourceKind::Image, id).await?;
///     Ok(observed.status.to_string())
/// }
/// ```
#[async_trait]
pub trait CloudClient: Send + Sync {
    /// Issues the remote create call.
    ///
    /// Returns the server-assigned identifier and the status reported by the
    /// create response, which may still be an intermediate status.
    async fn create(&self, descriptor: &ResourceDescriptor) -> Result<CreateAccepted, ClientError>;

    /// Fetches the current state of one object.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` when the identifier no longer exists.
    async fn get(&self, kind: ResourceKind, id: &str) -> Result<ObservedState, ClientError>;

    /// Lists objects of a kind.
    ///
    /// `hints` are advisory pre-filters; callers re-apply every criterion
    /// client-side.
    async fn list(
        &self,
        kind: ResourceKind,
        hints: &ListHints,
    ) -> Result<Vec<ObservedState>, ClientError>;

    /// Removes then adds tags on one object.
    async fn update_tags(
        &self,
        kind: ResourceKind,
        id: &str,
        delta: &TagDelta,
    ) -> Result<(), ClientError>;

    /// Changes scalar attributes on one object.
    async fn update_fields(
        &self,
        kind: ResourceKind,
        id: &str,
        changes: &[FieldChange],
    ) -> Result<(), ClientError>;

    /// Issues the remote delete call and returns the status it reported.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` when the object is already gone.
    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<ResourceStatus, ClientError>;

    /// Asks the key management service for a fresh data key.
    ///
    /// Backends without a key management service keep the default.
    async fn create_data_key(&self, key_id: &str, length_bits: u32) -> Result<DataKey, ClientError> {
        let _ = (key_id, length_bits);
        Err(ClientError::unsupported("create_data_key"))
    }

    /// Returns the name of this backend for logging.
    fn backend_name(&self) -> &'static str;
}
