use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default create-phase deadline.
pub const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// Default delete-phase deadline.
pub const DEFAULT_DELETE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// Default wait between two poll attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Bounds on how long the lifecycle controller waits for asynchronous
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    /// Bounds create-phase polling.
    pub create: Duration,
    /// Bounds delete-phase polling.
    pub delete: Duration,
    /// Fixed wait between poll attempts.
    pub poll_interval: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: DEFAULT_CREATE_TIMEOUT,
            delete: DEFAULT_DELETE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Timeouts {
    #[must_use]
    pub fn with_create(mut self, create: Duration) -> Self {
        self.create = create;
        self
    }

    #[must_use]
    pub fn with_delete(mut self, delete: Duration) -> Self {
        self.delete = delete;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}
