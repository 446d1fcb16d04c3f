//! Per-instance lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected move between two lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid lifecycle transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

/// Where one managed resource instance is in its lifecycle.
///
/// `TimedOut` covers every interrupted wait: the remote operation may still
/// complete, so the instance can be read again, deleted or re-created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Absent,
    Creating,
    Active,
    Failed,
    TimedOut,
    Updating,
    Deleting,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Creating => "creating",
            Self::Active => "active",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Updating => "updating",
            Self::Deleting => "deleting",
        }
    }

    /// Returns `true` if `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Absent, Creating)
                | (Creating, Active | Failed | TimedOut | Absent)
                | (Active, Updating | Deleting | Absent)
                | (Updating, Active | Failed)
                | (Deleting, Absent | Failed | TimedOut)
                | (Failed, Deleting | Creating | Absent)
                | (TimedOut, Active | Deleting | Creating | Absent)
        )
    }

    /// Moves to `next`, rejecting illegal transitions.
    pub fn transition(self, next: LifecycleState) -> Result<LifecycleState, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
