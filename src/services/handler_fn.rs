//! # Closure-backed handlers
//!
//! [`ServiceFn`], [`SlotFn`] and [`HookFn`] wrap plain closures so they can be
//! stored as `Arc<dyn ...>` handler objects. Shared state goes into the closure
//! explicitly (`Arc<...>`); the runtime never clones or mutates it.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use slotvisor::{ServiceFn, ServiceHandler, Startup};
//!
//! let h: Arc<dyn ServiceHandler> = ServiceFn::arc(|_rt: &slotvisor::Runtime| Ok(Startup::Weak));
//! # let _ = h;
//! ```

use std::sync::Arc;

use crate::core::Runtime;
use crate::error::HandlerError;
use crate::services::handler::{
    Intercept, Interception, ServiceHandler, SignalHandler, Startup,
};
use crate::signals::Signal;
use crate::slots::SlotRef;

/// Function-backed [`ServiceHandler`].
pub struct ServiceFn<F> {
    f: F,
}

impl<F> ServiceFn<F>
where
    F: Fn(&Runtime) -> Result<Startup, HandlerError> + Send + Sync + 'static,
{
    /// Wraps a startup closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps a startup closure and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F> ServiceHandler for ServiceFn<F>
where
    F: Fn(&Runtime) -> Result<Startup, HandlerError> + Send + Sync + 'static,
{
    fn start(&self, rt: &Runtime) -> Result<Startup, HandlerError> {
        (self.f)(rt)
    }
}

/// Function-backed [`SignalHandler`].
pub struct SlotFn<F> {
    f: F,
}

impl<F> SlotFn<F>
where
    F: Fn(&Runtime, &SlotRef, Option<&Signal>) -> Result<(), HandlerError>
        + Send
        + Sync
        + 'static,
{
    /// Wraps a slot closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps a slot closure and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F> SignalHandler for SlotFn<F>
where
    F: Fn(&Runtime, &SlotRef, Option<&Signal>) -> Result<(), HandlerError>
        + Send
        + Sync
        + 'static,
{
    fn on_signal(
        &self,
        rt: &Runtime,
        slot: &SlotRef,
        signal: Option<&Signal>,
    ) -> Result<(), HandlerError> {
        (self.f)(rt, slot, signal)
    }
}

/// Function-backed [`Intercept`] hook.
pub struct HookFn<F> {
    f: F,
}

impl<F> HookFn<F>
where
    F: Fn(&Runtime, &SlotRef, &Signal) -> Result<Interception, HandlerError>
        + Send
        + Sync
        + 'static,
{
    /// Wraps a hook closure and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self { f })
    }
}

impl<F> Intercept for HookFn<F>
where
    F: Fn(&Runtime, &SlotRef, &Signal) -> Result<Interception, HandlerError>
        + Send
        + Sync
        + 'static,
{
    fn intercept(
        &self,
        rt: &Runtime,
        slot: &SlotRef,
        signal: &Signal,
    ) -> Result<Interception, HandlerError> {
        (self.f)(rt, slot, signal)
    }
}
