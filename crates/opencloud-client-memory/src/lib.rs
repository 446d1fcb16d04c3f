//! In-memory cloud API backend.
//!
//! [`InMemoryCloud`] implements [`opencloud_client::CloudClient`] on top of a
//! papaya lock-free map. It stands in for the remote API in tests and local
//! dry runs: asynchronous transitions are simulated with [`StatusScript`]s,
//! failures can be injected per operation and every call is counted.
//!
//! ```ignore
//! use opencloud_client_memory::{ClientOperation, InMemoryCloud, StatusScript};
//!
//! let cloud = InMemoryCloud::new()
//!     .with_create_script(ResourceKind::Image, StatusScript::settle(["queued", "active"]));
//! assert_eq!(cloud.calls(ClientOperation::Create), 0);
//! ```

mod cloud;
mod script;

pub use cloud::{ClientOperation, DEFAULT_IMAGE_SIZE, InMemoryCloud};
pub use script::StatusScript;
