//! Resource lifecycle controller.
//!
//! Converges one remote object to its descriptor: create and wait for it to
//! become usable, read it back, push the minimal set of changes, delete it
//! and wait for it to disappear. The controller keeps no state between calls
//! and receives the client on every call, so invocations for different
//! resources can run concurrently.

use std::time::Duration;

use opencloud_client::CloudClient;
use opencloud_core::{
    FieldChange, ObservedState, ProviderError, ProviderResult, ResourceDescriptor, ResourceKind,
    StatusClass, TagDelta, Timeouts, diff_tags,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::poller::{PendingOperation, PollOutcome, Poller};
use crate::state::LifecycleState;

/// Result of a post-destroy check.
#[derive(Debug, Clone, PartialEq)]
pub enum DestroyCheck {
    /// The object is absent or scheduled for deletion.
    Gone,
    /// The object is still there.
    StillExists(Box<ObservedState>),
}

impl DestroyCheck {
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Gone)
    }
}

/// Drives resources through create, read, update and delete.
#[derive(Debug, Clone, Default)]
pub struct LifecycleController {
    timeouts: Timeouts,
}

impl LifecycleController {
    pub fn new(timeouts: Timeouts) -> Self {
        Self { timeouts }
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Creates the remote object and waits until it is usable.
    ///
    /// `timeout` overrides the configured create timeout. The deadline is
    /// fixed when the call starts and covers the create call, polling and
    /// the final read.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the descriptor is invalid; nothing is sent.
    /// - `CreateFailed` if the create call itself fails.
    /// - `OperationFailed` on a failure status or a status outside the
    ///   kind's vocabulary in the create response.
    /// - `Timeout` / `Cancelled` if the wait is interrupted.
    pub async fn create(
        &self,
        client: &dyn CloudClient,
        desired: &ResourceDescriptor,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> ProviderResult<ObservedState> {
        desired.validate()?;

        let kind = desired.kind();
        let started = Instant::now();
        let timeout = timeout.unwrap_or(self.timeouts.create);
        let mut tracker = Tracker::new(kind, "", LifecycleState::Absent);
        tracker.advance(LifecycleState::Creating)?;

        let result = self
            .create_and_wait(client, desired, started, timeout, cancel, &mut tracker)
            .await;
        match result {
            Ok(observed) => {
                tracker.advance(LifecycleState::Active)?;
                Ok(observed)
            }
            Err(err) => {
                tracker.interrupt(&err);
                Err(err)
            }
        }
    }

    async fn create_and_wait(
        &self,
        client: &dyn CloudClient,
        desired: &ResourceDescriptor,
        started: Instant,
        timeout: Duration,
        cancel: &CancellationToken,
        tracker: &mut Tracker,
    ) -> ProviderResult<ObservedState> {
        let kind = desired.kind();
        let accepted = client
            .create(desired)
            .await
            .map_err(|source| ProviderError::CreateFailed { kind, source })?;
        tracker.id = accepted.id.clone();
        info!(
            kind = %kind,
            id = %accepted.id,
            status = %accepted.status,
            backend = client.backend_name(),
            "Create accepted"
        );

        match kind.create_policy().classify(&accepted.status) {
            StatusClass::Success => {}
            StatusClass::Failure => {
                return Err(ProviderError::operation_failed(
                    kind,
                    &accepted.id,
                    accepted.status.as_str(),
                    "create reported a failure status",
                ));
            }
            StatusClass::Unknown => {
                return Err(ProviderError::operation_failed(
                    kind,
                    &accepted.id,
                    accepted.status.as_str(),
                    "unexpected status in create response",
                ));
            }
            StatusClass::Pending => {
                let op = PendingOperation::create(
                    kind,
                    &accepted.id,
                    started,
                    timeout,
                    self.timeouts.poll_interval,
                );
                Poller::new(client, cancel).await_operation(&op).await?;
            }
        }

        client
            .get(kind, &accepted.id)
            .await
            .map_err(ProviderError::from_read)
    }

    /// Fetches the current state of a remote object.
    pub async fn read(
        &self,
        client: &dyn CloudClient,
        kind: ResourceKind,
        id: &str,
    ) -> ProviderResult<ObservedState> {
        client
            .get(kind, id)
            .await
            .map_err(ProviderError::from_read)
    }

    /// Pushes the difference between `desired` and `observed`.
    ///
    /// Scalar changes go out in one `update_fields` call and tag changes in
    /// one `update_tags` call, each only when non-empty. When nothing
    /// differs no remote call is made and `observed` is returned as is.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` if the kinds differ or an immutable attribute
    /// changed; nothing is sent in that case.
    pub async fn update(
        &self,
        client: &dyn CloudClient,
        id: &str,
        desired: &ResourceDescriptor,
        observed: &ObservedState,
    ) -> ProviderResult<ObservedState> {
        desired.validate()?;
        if observed.id != id {
            return Err(ProviderError::validation(format!(
                "observed state belongs to {}, not {id}",
                observed.id
            )));
        }

        let kind = desired.kind();
        let changes = desired.field_changes(observed)?;
        let delta = diff_tags(&desired.tags(), &observed.tags);
        if changes.is_empty() && delta.is_empty() {
            debug!(kind = %kind, id, "Resource already matches its descriptor");
            return Ok(observed.clone());
        }

        let mut tracker = Tracker::new(kind, id, LifecycleState::Active);
        tracker.advance(LifecycleState::Updating)?;

        let result = self
            .push_changes(client, kind, id, &changes, &delta)
            .await;

        match result {
            Ok(refreshed) => {
                tracker.advance(LifecycleState::Active)?;
                Ok(refreshed)
            }
            Err(err) => {
                tracker.interrupt(&err);
                Err(err)
            }
        }
    }

    async fn push_changes(
        &self,
        client: &dyn CloudClient,
        kind: ResourceKind,
        id: &str,
        changes: &[FieldChange],
        delta: &TagDelta,
    ) -> ProviderResult<ObservedState> {
        if !changes.is_empty() {
            let fields: Vec<&str> = changes.iter().map(FieldChange::field_name).collect();
            debug!(kind = %kind, id, ?fields, "Updating fields");
            client
                .update_fields(kind, id, changes)
                .await
                .map_err(ProviderError::from_read)?;
        }
        if !delta.is_empty() {
            debug!(
                kind = %kind,
                id,
                added = delta.to_add.len(),
                removed = delta.to_remove.len(),
                "Updating tags"
            );
            client
                .update_tags(kind, id, delta)
                .await
                .map_err(ProviderError::from_read)?;
        }
        client
            .get(kind, id)
            .await
            .map_err(ProviderError::from_read)
    }

    /// Deletes the remote object and waits until it is gone.
    ///
    /// An object that is already absent when the delete call is made counts
    /// as deleted.
    pub async fn delete(
        &self,
        client: &dyn CloudClient,
        kind: ResourceKind,
        id: &str,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> ProviderResult<()> {
        let started = Instant::now();
        let timeout = timeout.unwrap_or(self.timeouts.delete);
        let mut tracker = Tracker::new(kind, id, LifecycleState::Active);
        tracker.advance(LifecycleState::Deleting)?;

        match self
            .delete_and_wait(client, kind, id, started, timeout, cancel)
            .await
        {
            Ok(()) => tracker.advance(LifecycleState::Absent),
            Err(err) => {
                tracker.interrupt(&err);
                Err(err)
            }
        }
    }

    async fn delete_and_wait(
        &self,
        client: &dyn CloudClient,
        kind: ResourceKind,
        id: &str,
        started: Instant,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ProviderResult<()> {
        let status = match client.delete(kind, id).await {
            Ok(status) => status,
            Err(err) if err.is_not_found() => {
                warn!(kind = %kind, id, "Resource already absent on delete, treating as deleted");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        match kind.delete_policy().classify(&status) {
            StatusClass::Success => Ok(()),
            StatusClass::Failure => Err(ProviderError::operation_failed(
                kind,
                id,
                status.as_str(),
                "delete reported a failure status",
            )),
            StatusClass::Pending | StatusClass::Unknown => {
                let op = PendingOperation::delete(
                    kind,
                    id,
                    started,
                    timeout,
                    self.timeouts.poll_interval,
                );
                match Poller::new(client, cancel).await_operation(&op).await? {
                    PollOutcome::Gone => debug!(kind = %kind, id, "Resource disappeared"),
                    PollOutcome::Reached(status) => {
                        debug!(kind = %kind, id, status = %status, "Resource reached deleted status")
                    }
                }
                Ok(())
            }
        }
    }

    /// Confirms that a destroyed object is really gone.
    ///
    /// A `NotFound` read or a delete success status (for kinds that stay
    /// listed while scheduled for deletion) both count as gone.
    pub async fn verify_destroyed(
        &self,
        client: &dyn CloudClient,
        kind: ResourceKind,
        id: &str,
    ) -> ProviderResult<DestroyCheck> {
        match client.get(kind, id).await {
            Ok(observed) => match kind.delete_policy().classify(&observed.status) {
                StatusClass::Success => Ok(DestroyCheck::Gone),
                _ => Ok(DestroyCheck::StillExists(Box::new(observed))),
            },
            Err(err) if err.is_not_found() => Ok(DestroyCheck::Gone),
            Err(err) => Err(err.into()),
        }
    }
}

/// Tracks and logs the lifecycle state of one instance during a call.
struct Tracker {
    kind: ResourceKind,
    id: String,
    state: LifecycleState,
}

impl Tracker {
    fn new(kind: ResourceKind, id: impl Into<String>, state: LifecycleState) -> Self {
        Self {
            kind,
            id: id.into(),
            state,
        }
    }

    fn advance(&mut self, next: LifecycleState) -> ProviderResult<()> {
        let from = self.state;
        self.state = from
            .transition(next)
            .map_err(|err| ProviderError::validation(err.to_string()))?;
        info!(
            kind = %self.kind,
            id = %self.id,
            from = %from,
            to = %self.state,
            "Lifecycle transition"
        );
        Ok(())
    }

    fn interrupt(&mut self, err: &ProviderError) {
        let next = match err {
            ProviderError::Timeout { .. } | ProviderError::Cancelled { .. } => {
                LifecycleState::TimedOut
            }
            _ => LifecycleState::Failed,
        };
        if self.state.can_transition_to(next) {
            self.state = next;
        }
        warn!(
            kind = %self.kind,
            id = %self.id,
            state = %self.state,
            category = %err.category(),
            error = %err,
            "Lifecycle operation did not complete"
        );
    }
}
