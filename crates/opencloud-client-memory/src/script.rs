//! Scripted status progressions.
//!
//! The in-memory backend does not run anything asynchronously. Instead each
//! create or delete arms a script: the first status is returned by the call
//! itself and every following `get` advances one step.

use opencloud_core::{ResourceKind, ResourceStatus};

/// A sequence of statuses an object walks through after a create or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusScript {
    pub(crate) statuses: Vec<ResourceStatus>,
    pub(crate) vanish: bool,
}

impl StatusScript {
    /// A progression that ends with the object still present.
    pub fn settle<I, S>(statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ResourceStatus>,
    {
        Self {
            statuses: statuses.into_iter().map(Into::into).collect(),
            vanish: false,
        }
    }

    /// A progression after which `get` reports the object as absent.
    pub fn vanish<I, S>(statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ResourceStatus>,
    {
        Self {
            statuses: statuses.into_iter().map(Into::into).collect(),
            vanish: true,
        }
    }

    /// Default create progression per kind.
    pub fn default_create(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Image => Self::settle(["queued", "saving", "active"]),
            ResourceKind::Stack => Self::settle(["CREATE_IN_PROGRESS", "CREATE_COMPLETE"]),
            ResourceKind::Key => Self::settle(["enabled"]),
        }
    }

    /// Default delete progression per kind.
    ///
    /// Images disappear at once, stacks go through `DELETE_IN_PROGRESS`,
    /// keys stay listed as scheduled for deletion.
    pub fn default_delete(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Image => Self::vanish(["deleted"]),
            ResourceKind::Stack => Self::vanish(["DELETE_IN_PROGRESS", "DELETE_IN_PROGRESS"]),
            ResourceKind::Key => Self::settle(["pending_deletion"]),
        }
    }
}
