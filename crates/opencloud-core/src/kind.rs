//! Resource kinds and their remote status vocabularies.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The kinds of remote resources managed by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// An image in the image service (Glance v2).
    Image,
    /// An orchestration stack (RTS / Heat).
    Stack,
    /// A customer master key in the key management service.
    Key,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Stack => "stack",
            Self::Key => "key",
        }
    }

    /// Status vocabulary used while waiting for a create to settle.
    #[must_use]
    pub fn create_policy(&self) -> StatusPolicy {
        match self {
            Self::Image => StatusPolicy::new(
                &["active"],
                &["killed", "deleted", "deactivated"],
                &["queued", "saving", "importing", "uploading"],
            ),
            Self::Stack => StatusPolicy::new(
                &["CREATE_COMPLETE"],
                &["CREATE_FAILED", "ROLLBACK_COMPLETE", "ROLLBACK_FAILED"],
                &["CREATE_IN_PROGRESS", "ROLLBACK_IN_PROGRESS"],
            ),
            Self::Key => StatusPolicy::new(&["enabled"], &[], &["creating"]),
        }
    }

    /// Status vocabulary used while waiting for a delete to settle.
    ///
    /// Success statuses here mean the object is as good as gone; absence
    /// from the API is accepted separately by the poller.
    #[must_use]
    pub fn delete_policy(&self) -> StatusPolicy {
        match self {
            Self::Image => StatusPolicy::new(&["deleted", "pending_delete"], &[], &[]),
            Self::Stack => StatusPolicy::new(
                &["DELETE_COMPLETE"],
                &["DELETE_FAILED"],
                &["DELETE_IN_PROGRESS"],
            ),
            Self::Key => StatusPolicy::new(&["pending_deletion"], &[], &[]),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status string as reported by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceStatus(String);

impl ResourceStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceStatus {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ResourceStatus {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// How a single observed status should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// The awaited transition completed.
    Success,
    /// The remote side reported a definite failure.
    Failure,
    /// A known intermediate status.
    Pending,
    /// A status the policy does not mention.
    Unknown,
}

/// Success, failure and pending statuses for one phase of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusPolicy {
    success: BTreeSet<String>,
    failure: BTreeSet<String>,
    pending: BTreeSet<String>,
}

impl StatusPolicy {
    pub fn new(success: &[&str], failure: &[&str], pending: &[&str]) -> Self {
        let collect = |statuses: &[&str]| -> BTreeSet<String> {
            statuses.iter().map(|s| s.to_string()).collect()
        };
        Self {
            success: collect(success),
            failure: collect(failure),
            pending: collect(pending),
        }
    }

    /// Classifies an observed status. Success wins over failure if a status
    /// is listed in both.
    #[must_use]
    pub fn classify(&self, status: &ResourceStatus) -> StatusClass {
        let s = status.as_str();
        if self.success.contains(s) {
            StatusClass::Success
        } else if self.failure.contains(s) {
            StatusClass::Failure
        } else if self.pending.contains(s) {
            StatusClass::Pending
        } else {
            StatusClass::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_create_policy() {
        let policy = ResourceKind::Image.create_policy();
        assert_eq!(policy.classify(&"active".into()), StatusClass::Success);
        assert_eq!(policy.classify(&"killed".into()), StatusClass::Failure);
        assert_eq!(policy.classify(&"queued".into()), StatusClass::Pending);
        assert_eq!(policy.classify(&"saving".into()), StatusClass::Pending);
        assert_eq!(policy.classify(&"bogus".into()), StatusClass::Unknown);
    }

    #[test]
    fn test_stack_status_vocabulary_is_case_sensitive() {
        let policy = ResourceKind::Stack.create_policy();
        assert_eq!(
            policy.classify(&"CREATE_COMPLETE".into()),
            StatusClass::Success
        );
        assert_eq!(
            policy.classify(&"create_complete".into()),
            StatusClass::Unknown
        );
        assert_eq!(
            ResourceKind::Stack
                .delete_policy()
                .classify(&"DELETE_FAILED".into()),
            StatusClass::Failure
        );
    }

    #[test]
    fn test_kind_serde_names() {
        let json = serde_json::to_string(&ResourceKind::Key).unwrap();
        assert_eq!(json, "\"key\"");
        assert_eq!(ResourceKind::Image.to_string(), "image");
    }
}
