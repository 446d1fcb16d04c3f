//! Observed remote state.
//!
//! An [`ObservedState`] is a snapshot of what the remote API returned on the
//! last `get` or `list`. Nothing here is cached; callers re-fetch on every
//! read.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::descriptor::Visibility;
use crate::kind::{ResourceKind, ResourceStatus};
use crate::tags::TagSet;

/// The remote object's attributes as last fetched.
///
/// A non-empty `id` always names an object that existed at fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedState {
    /// Server-assigned identifier.
    pub id: String,
    pub kind: ResourceKind,
    /// Display name (image name, stack name or key alias).
    pub name: String,
    pub status: ResourceStatus,
    /// Only images carry a visibility.
    pub visibility: Option<Visibility>,
    pub tags: TagSet,
    /// Size of the stored payload, when the API reports one.
    pub size_bytes: Option<u64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub details: ObservedDetails,
}

impl ObservedState {
    /// Creates a snapshot with kind-default details and the current time.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: ResourceKind,
        name: impl Into<String>,
        status: impl Into<ResourceStatus>,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            status: status.into(),
            visibility: None,
            tags: TagSet::new(),
            size_bytes: None,
            created_at: now,
            updated_at: now,
            details: ObservedDetails::default_for(kind),
        }
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    #[must_use]
    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = created_at;
        self.updated_at = created_at;
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: ObservedDetails) -> Self {
        self.details = details;
        self
    }

    /// Returns the image details, if this is an image.
    pub fn image(&self) -> Option<&ImageDetails> {
        match &self.details {
            ObservedDetails::Image(details) => Some(details),
            _ => None,
        }
    }

    /// Returns the stack details, if this is a stack.
    pub fn stack(&self) -> Option<&StackDetails> {
        match &self.details {
            ObservedDetails::Stack(details) => Some(details),
            _ => None,
        }
    }

    /// Returns the key details, if this is a key.
    pub fn key(&self) -> Option<&KeyDetails> {
        match &self.details {
            ObservedDetails::Key(details) => Some(details),
            _ => None,
        }
    }
}

/// Kind-specific observed attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObservedDetails {
    Image(ImageDetails),
    Stack(StackDetails),
    Key(KeyDetails),
}

impl ObservedDetails {
    pub fn default_for(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Image => Self::Image(ImageDetails::default()),
            ResourceKind::Stack => Self::Stack(StackDetails::default()),
            ResourceKind::Key => Self::Key(KeyDetails::default()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDetails {
    pub container_format: String,
    pub disk_format: String,
    pub min_disk_gb: u64,
    pub min_ram_mb: u64,
    pub protected: bool,
    pub checksum: Option<String>,
    /// Path of the image data within the image service.
    pub file: Option<String>,
    /// Path of the JSON schema describing the image.
    pub schema: Option<String>,
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDetails {
    pub template_body: String,
    pub parameters: BTreeMap<String, String>,
    pub timeout_mins: u32,
    pub disable_rollback: bool,
    pub status_reason: Option<String>,
    /// Resources the stack template produced.
    pub resources: Vec<StackResource>,
}

/// A single resource inside a stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackResource {
    /// Logical name from the template.
    pub resource_name: String,
    pub physical_resource_id: String,
    /// Template type, e.g. `OS::Heat::RandomString`.
    pub resource_type: String,
    pub resource_status: String,
    pub status_reason: Option<String>,
    pub required_by: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDetails {
    pub description: String,
    pub realm: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_new_uses_kind_default_details() {
        let image = ObservedState::new("i1", ResourceKind::Image, "cirros", "active");
        assert!(image.image().is_some());
        assert!(image.stack().is_none());

        let stack = ObservedState::new("s1", ResourceKind::Stack, "rts_stack", "CREATE_COMPLETE");
        assert!(stack.stack().is_some());
    }

    #[test]
    fn test_serde_round_trip_keeps_timestamps() {
        let observed = ObservedState::new("k1", ResourceKind::Key, "alias", "enabled")
            .with_created_at(datetime!(2018-03-01 12:00 UTC));
        let json = serde_json::to_value(&observed).unwrap();
        assert_eq!(json["created_at"], "2018-03-01T12:00:00Z");
        assert_eq!(json["details"]["kind"], "key");

        let back: ObservedState = serde_json::from_value(json).unwrap();
        assert_eq!(back, observed);
    }
}
