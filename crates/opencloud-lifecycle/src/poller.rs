//! Async operation poller.
//!
//! Remote creates and deletes complete asynchronously. The poller re-reads
//! the object at a fixed interval until its status is terminal, it
//! disappears, the deadline passes or the caller cancels.
//!
//! The decision taken on each observation lives in [`PollState`], which does
//! no I/O. [`Poller`] only feeds it observations and sleeps in between.

use std::time::Duration;

use opencloud_client::CloudClient;
use opencloud_core::{
    ProviderError, ProviderResult, ResourceKind, ResourceStatus, StatusClass, StatusPolicy,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Longest wait honoured for one operation; larger timeouts are capped.
pub const MAX_WAIT: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

fn deadline_after(started: Instant, timeout: Duration) -> Instant {
    started
        .checked_add(timeout.min(MAX_WAIT))
        .unwrap_or(started)
}

/// How a pending operation finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The object reported a success status.
    Reached(ResourceStatus),
    /// The object no longer exists and absence counts as success.
    Gone,
}

/// An in-flight remote operation awaiting a terminal status.
#[derive(Debug, Clone)]
pub struct PendingOperation {
    pub kind: ResourceKind,
    /// Identifier of the object being watched.
    pub target: String,
    pub policy: StatusPolicy,
    /// `true` in the delete phase, where `NotFound` means done.
    pub absence_is_success: bool,
    /// When the operation started; used to report the time waited.
    pub started: Instant,
    pub deadline: Instant,
    pub poll_interval: Duration,
}

impl PendingOperation {
    /// Watches a create, using the kind's create statuses.
    pub fn create(
        kind: ResourceKind,
        target: impl Into<String>,
        started: Instant,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            kind,
            target: target.into(),
            policy: kind.create_policy(),
            absence_is_success: false,
            started,
            deadline: deadline_after(started, timeout),
            poll_interval,
        }
    }

    /// Watches a delete, using the kind's delete statuses.
    pub fn delete(
        kind: ResourceKind,
        target: impl Into<String>,
        started: Instant,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            kind,
            target: target.into(),
            policy: kind.delete_policy(),
            absence_is_success: true,
            started,
            deadline: deadline_after(started, timeout),
            poll_interval,
        }
    }
}

/// One observation of the watched object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Status(ResourceStatus),
    Absent,
}

/// What to do after an observation.
#[derive(Debug)]
pub enum PollStep {
    Done(PollOutcome),
    Failed(ProviderError),
    Continue,
}

/// Accumulated poll state for one pending operation.
#[derive(Debug, Clone, Default)]
pub struct PollState {
    last_status: Option<ResourceStatus>,
    observations: u32,
}

impl PollState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies one observation.
    pub fn observe(&mut self, op: &PendingOperation, observation: Observation) -> PollStep {
        self.observations += 1;
        match observation {
            Observation::Absent if op.absence_is_success => PollStep::Done(PollOutcome::Gone),
            Observation::Absent => {
                PollStep::Failed(ProviderError::not_found(op.kind, op.target.clone()))
            }
            Observation::Status(status) => {
                let class = op.policy.classify(&status);
                self.last_status = Some(status.clone());
                match class {
                    StatusClass::Success => PollStep::Done(PollOutcome::Reached(status)),
                    StatusClass::Failure => PollStep::Failed(ProviderError::operation_failed(
                        op.kind,
                        op.target.clone(),
                        status.as_str(),
                        "remote operation reported a failure status",
                    )),
                    StatusClass::Pending | StatusClass::Unknown => PollStep::Continue,
                }
            }
        }
    }

    /// The error to report once the deadline has passed.
    pub fn timed_out(&self, op: &PendingOperation, now: Instant) -> ProviderError {
        ProviderError::Timeout {
            kind: op.kind,
            id: op.target.clone(),
            last_status: self
                .last_status
                .as_ref()
                .map(ResourceStatus::to_string)
                .unwrap_or_else(|| "unknown".to_string()),
            waited: now.saturating_duration_since(op.started),
        }
    }

    pub fn last_status(&self) -> Option<&ResourceStatus> {
        self.last_status.as_ref()
    }

    pub fn observations(&self) -> u32 {
        self.observations
    }
}

/// Drives a [`PendingOperation`] to completion against a client.
pub struct Poller<'a> {
    client: &'a dyn CloudClient,
    cancel: &'a CancellationToken,
}

impl<'a> Poller<'a> {
    pub fn new(client: &'a dyn CloudClient, cancel: &'a CancellationToken) -> Self {
        Self { client, cancel }
    }

    /// Polls until the operation reaches a terminal outcome.
    ///
    /// The object is observed immediately, then every `poll_interval`. The
    /// last sleep is shortened so one observation lands on the deadline;
    /// `Timeout` is only returned after it. Each read is bounded by the
    /// deadline and raced against cancellation, so a stalled read cannot
    /// hold the operation past either.
    ///
    /// # Errors
    ///
    /// - `OperationFailed` on a failure status, without waiting further.
    /// - `NotFound` if the object disappears outside the delete phase.
    /// - `Timeout` once the deadline has passed.
    /// - `Cancelled` if the token fires before a terminal outcome.
    /// - `Client` for transport errors, unclassified.
    pub async fn await_operation(&self, op: &PendingOperation) -> ProviderResult<PollOutcome> {
        let mut state = PollState::new();

        loop {
            let fetched = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    return Err(self.cancelled(op));
                }
                fetched = tokio::time::timeout_at(
                    op.deadline,
                    self.client.get(op.kind, &op.target),
                ) => fetched,
            };

            let observation = match fetched {
                Ok(Ok(observed)) => Observation::Status(observed.status),
                Ok(Err(err)) if err.is_not_found() => Observation::Absent,
                Ok(Err(err)) => return Err(err.into()),
                // The read itself outlived the deadline.
                Err(_) => return Err(state.timed_out(op, Instant::now())),
            };
            debug!(
                kind = %op.kind,
                id = %op.target,
                observation = ?observation,
                "Polled pending operation"
            );

            match state.observe(op, observation) {
                PollStep::Done(outcome) => return Ok(outcome),
                PollStep::Failed(err) => return Err(err),
                PollStep::Continue => {}
            }

            let now = Instant::now();
            if now >= op.deadline {
                return Err(state.timed_out(op, now));
            }
            let wait = op.poll_interval.min(op.deadline - now);

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    return Err(self.cancelled(op));
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    fn cancelled(&self, op: &PendingOperation) -> ProviderError {
        ProviderError::Cancelled {
            kind: op.kind,
            id: op.target.clone(),
        }
    }
}
