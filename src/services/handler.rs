//! # Handler abstractions.
//!
//! Three capability traits cover every piece of user code the runtime calls:
//!
//! - [`ServiceHandler`]: startup of a service (runs exactly once per service).
//! - [`SignalHandler`]: slot and poll bodies; also receives the teardown
//!   notification (`signal == None`) on a service's primary slot.
//! - [`Intercept`]: optional per-service hook that may pre-empt normal slot
//!   dispatch for signals the service originates.
//!
//! All handlers run inside a protected call: returning `Err` or panicking is
//! caught at the boundary and never escapes into the worker loop.
//!
//! # Example
//! ```
//! use slotvisor::{HandlerError, Runtime, ServiceHandler, Startup};
//!
//! struct Echo;
//!
//! impl ServiceHandler for Echo {
//!     fn start(&self, rt: &Runtime) -> Result<Startup, HandlerError> {
//!         rt.new_slot("ping", |_rt, _slot, _sig| Ok(()))?;
//!         Ok(Startup::Live)
//!     }
//! }
//! ```

use crate::core::Runtime;
use crate::error::{HandlerError, Status};
use crate::signals::Signal;
use crate::slots::SlotRef;

/// Result of a successful service startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Startup {
    /// The service counts towards the live-service total.
    Live,
    /// The service is excluded from the live-service total and never keeps the
    /// runtime alive on its own.
    Weak,
}

impl Startup {
    /// `Live` → [`Status::Ok`], `Weak` → [`Status::Weak`].
    pub fn status(self) -> Status {
        match self {
            Startup::Live => Status::Ok,
            Startup::Weak => Status::Weak,
        }
    }
}

/// Decision of an interception hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interception {
    /// The hook consumed the signal; the slot handler is skipped.
    Handled,
    /// The hook declined; the slot handler runs as usual.
    Pass,
}

/// Startup routine of a service.
pub trait ServiceHandler: Send + Sync + 'static {
    /// Called once, on the requiring thread, with the new service as the current one.
    fn start(&self, rt: &Runtime) -> Result<Startup, HandlerError>;
}

/// Body of a queued slot or a poll.
pub trait SignalHandler: Send + Sync + 'static {
    /// Handles one signal.
    ///
    /// `signal` is `None` for the teardown notification of a service's primary
    /// slot and for the single invocation of a poll body.
    fn on_signal(
        &self,
        rt: &Runtime,
        slot: &SlotRef,
        signal: Option<&Signal>,
    ) -> Result<(), HandlerError>;
}

/// Interception hook attached to a source service.
pub trait Intercept: Send + Sync + 'static {
    /// Sees every signal emitted by the hooked service before its target slot does.
    fn intercept(
        &self,
        rt: &Runtime,
        slot: &SlotRef,
        signal: &Signal,
    ) -> Result<Interception, HandlerError>;
}
