//! Runtime core: state, scheduling and service lifecycle.
//!
//! The public API from this module is [`Runtime`] (plus its [`RuntimeBuilder`]
//! and [`RuntimeConfig`]), which owns the services, routes signals and runs the
//! worker pool.
//!
//! Internal modules:
//! - [`runtime`]: shared state, configuration, protected calls;
//! - [`lifecycle`]: require/boot, close, teardown and runtime destruction;
//! - [`routing`]: slot and poll creation, emission, poll waits;
//! - [`scheduler`]: worker loop, batch dispatch, per-signal delivery;
//! - [`registry`]: name → service/slot table and preload table;
//! - [`alive`]: live-service count and terminal threshold;
//! - [`shutdown`]: shutdown token.

mod alive;
mod builder;
mod config;
mod lifecycle;
mod registry;
mod routing;
mod runtime;
mod scheduler;
mod shutdown;

pub use builder::RuntimeBuilder;
pub use config::{MAX_SERVICE_NAME, MAX_SLOT_NAME, MAX_THREADS, RuntimeConfig};
pub use routing::SlotTarget;
pub use runtime::Runtime;
pub(crate) use runtime::RuntimeInner;
