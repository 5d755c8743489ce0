//! Bus-facing side of the bridge.
//!
//! The gateway talks to the remote booking service only through the shared
//! backbone: requests go out through the [`MessagePublisher`], responses come
//! back through the [`ResponseListener`], and the [`CorrelationRegistry`]
//! pairs them up.

pub mod listener;
pub mod publisher;
pub mod registry;

pub use listener::{Disposition, ResponseListener};
pub use publisher::MessagePublisher;
pub use registry::{run_sweeper, CorrelationRegistry, RegistryStats, Settlement, Waiter};
