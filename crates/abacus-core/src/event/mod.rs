//! # Abacus Event System
//!
//! Two channels leave the runtime:
//!
//! - **Config watchers** ([`watchers`]): synchronous callbacks registered per
//!   plugin id, invoked in registration order for every
//!   [`ConfigChangeEvent`]. A panicking watcher is isolated from the rest.
//! - **Broadcast** ([`hub`] and the config manager's change channel): bounded
//!   `tokio::sync::broadcast` fan-out for async consumers; lagging receivers
//!   drop events instead of blocking the publisher.
pub mod error;
pub mod hub;
pub mod types;
pub mod watchers;

pub use error::EventSystemError;
pub use hub::EventHub;
pub use types::{ConfigChangeEvent, RuntimeEvent, WILDCARD_PATH};
pub use watchers::{WatchCallback, WatchHandle, WatcherId, WatcherRegistry};
