//! # opencloud-lifecycle
//!
//! Resource lifecycle controller and async operation poller.
//!
//! [`LifecycleController`] converges one remote object to a
//! [`ResourceDescriptor`](opencloud_core::ResourceDescriptor). Creates and
//! deletes that complete asynchronously are awaited by the [`Poller`], which
//! re-reads the object at a fixed interval until a terminal status, the
//! deadline or cancellation.
//!
//! ```ignore
//! let controller = LifecycleController::new(Timeouts::default());
//! let cancel = CancellationToken::new();
//! let image = controller.create(&client, &descriptor, None, &cancel).await?;
//! controller.delete(&client, ResourceKind::Image, &image.id, None, &cancel).await?;
//! ```

pub mod controller;
pub mod poller;
pub mod state;

pub use controller::{DestroyCheck, LifecycleController};
pub use poller::{Observation, PendingOperation, PollOutcome, PollState, PollStep, Poller};
pub use state::{InvalidTransition, LifecycleState};
pub use tokio_util::sync::CancellationToken;
