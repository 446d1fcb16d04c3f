//! Reads that never answer must not outlive the deadline or a cancellation.

use std::time::Duration;

use async_trait::async_trait;
use opencloud_client::{CloudClient, CreateAccepted, ListHints};
use opencloud_client_memory::InMemoryCloud;
use opencloud_core::{
    ClientError, FieldChange, ImageDescriptor, ObservedState, ProviderError, ResourceDescriptor,
    ResourceKind, ResourceStatus, TagDelta, Timeouts,
};
use opencloud_lifecycle::{CancellationToken, LifecycleController};
use tokio::time::Instant;

const HANG: Duration = Duration::from_secs(3600);

/// Delegates to the in-memory cloud, except that `get` hangs for an hour.
struct HangingCloud {
    inner: InMemoryCloud,
}

impl HangingCloud {
    fn new() -> Self {
        Self {
            inner: InMemoryCloud::new(),
        }
    }
}

#[async_trait]
impl CloudClient for HangingCloud {
    async fn create(&self, descriptor: &ResourceDescriptor) -> Result<CreateAccepted, ClientError> {
        self.inner.create(descriptor).await
    }

    async fn get(&self, kind: ResourceKind, id: &str) -> Result<ObservedState, ClientError> {
        tokio::time::sleep(HANG).await;
        self.inner.get(kind, id).await
    }

    async fn list(
        &self,
        kind: ResourceKind,
        hints: &ListHints,
    ) -> Result<Vec<ObservedState>, ClientError> {
        self.inner.list(kind, hints).await
    }

    async fn update_tags(
        &self,
        kind: ResourceKind,
        id: &str,
        delta: &TagDelta,
    ) -> Result<(), ClientError> {
        self.inner.update_tags(kind, id, delta).await
    }

    async fn update_fields(
        &self,
        kind: ResourceKind,
        id: &str,
        changes: &[FieldChange],
    ) -> Result<(), ClientError> {
        self.inner.update_fields(kind, id, changes).await
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<ResourceStatus, ClientError> {
        self.inner.delete(kind, id).await
    }

    fn backend_name(&self) -> &'static str {
        "hanging"
    }
}

fn controller() -> LifecycleController {
    LifecycleController::new(
        Timeouts::default()
            .with_create(Duration::from_secs(60))
            .with_delete(Duration::from_secs(60))
            .with_poll_interval(Duration::from_secs(3)),
    )
}

fn cirros() -> ResourceDescriptor {
    ResourceDescriptor::Image(ImageDescriptor::new("CirrOS-tf_1", "bare", "qcow2"))
}

fn cancel_after(delay: Duration) -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        trigger.cancel();
    });
    cancel
}

fn seeded_stack(cloud: &HangingCloud) {
    cloud.inner.insert(ObservedState::new(
        "stack-1",
        ResourceKind::Stack,
        "terraform_provider_stack",
        "CREATE_COMPLETE",
    ));
}

#[tokio::test(start_paused = true)]
async fn test_create_cancelled_during_hanging_read() {
    let cloud = HangingCloud::new();
    let cancel = cancel_after(Duration::from_secs(5));
    let start = Instant::now();

    let err = controller()
        .create(&cloud, &cirros(), Some(Duration::from_secs(10)), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_create_times_out_during_hanging_read() {
    let cloud = HangingCloud::new();
    let timeout = Duration::from_secs(10);
    let start = Instant::now();

    let err = controller()
        .create(&cloud, &cirros(), Some(timeout), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    let elapsed = start.elapsed();
    assert!(elapsed >= timeout && elapsed < HANG, "elapsed {elapsed:?}");
    match err {
        ProviderError::Timeout {
            last_status, waited, ..
        } => {
            assert_eq!(last_status, "unknown");
            assert!(waited >= timeout);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_delete_times_out_during_hanging_read() {
    let cloud = HangingCloud::new();
    seeded_stack(&cloud);
    let timeout = Duration::from_secs(30);
    let start = Instant::now();

    let err = controller()
        .delete(
            &cloud,
            ResourceKind::Stack,
            "stack-1",
            Some(timeout),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    let elapsed = start.elapsed();
    assert!(elapsed >= timeout && elapsed < HANG, "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_delete_cancelled_during_hanging_read() {
    let cloud = HangingCloud::new();
    seeded_stack(&cloud);
    let cancel = cancel_after(Duration::from_secs(5));
    let start = Instant::now();

    let err = controller()
        .delete(&cloud, ResourceKind::Stack, "stack-1", None, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Cancelled { ref id, .. } if id == "stack-1"));
    assert!(start.elapsed() < Duration::from_secs(60));
}
