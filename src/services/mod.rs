//! Services: actors, handler traits and built-in services.
//!
//! ## Contents
//! - [`Service`] actor with a private signal queue and lifecycle
//! - [`ServiceHandler`], [`SignalHandler`], [`Intercept`] user code entry points
//! - [`ServiceFn`], [`SlotFn`], [`HookFn`] closure adapters
//! - [`MonitorTracker`] built-in `monitor` service
//! - `LogWriter` built-in `log` service (feature `logging`)

mod handler;
mod handler_fn;
#[cfg(feature = "logging")]
mod log;
mod monitor;
mod service;

pub use handler::{Intercept, Interception, ServiceHandler, SignalHandler, Startup};
pub use handler_fn::{HookFn, ServiceFn, SlotFn};
#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use monitor::{MONITOR_DELETED, MONITOR_STARTED, MonitorTracker};
pub(crate) use service::{Boot, ServiceState};
pub use service::{Lifecycle, Service, ServiceRef};
