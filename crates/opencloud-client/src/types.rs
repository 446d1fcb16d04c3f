//! Request and response types of the cloud API capability trait.

use opencloud_core::{ResourceStatus, Visibility};
use serde::{Deserialize, Serialize};

/// Result of an accepted create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccepted {
    /// Server-assigned identifier of the new object.
    pub id: String,
    /// Status reported by the create response.
    pub status: ResourceStatus,
}

impl CreateAccepted {
    pub fn new(id: impl Into<String>, status: impl Into<ResourceStatus>) -> Self {
        Self {
            id: id.into(),
            status: status.into(),
        }
    }
}

/// Advisory server-side pre-filters for a list call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListHints {
    pub name: Option<String>,
    pub visibility: Option<Visibility>,
    pub tag: Option<String>,
}

impl ListHints {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// A data key issued by the key management service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataKey {
    /// Identifier of the master key that encrypted the data key.
    pub key_id: String,
    /// Hex encoded plaintext key material.
    pub plain_text: String,
    /// Hex encoded ciphertext of the data key.
    pub cipher_text: String,
}
