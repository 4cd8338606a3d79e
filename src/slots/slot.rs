//! # Slot: named, service-owned message sink.
//!
//! Two flavors share one type:
//! - **queued**: signals are appended to the owning service's queue and
//!   delivered by a pool worker calling the slot handler;
//! - **poll**: signals are appended to the poll's private queue and pulled by
//!   its dedicated thread through [`Runtime::wait`](crate::Runtime::wait).
//!
//! Slot names are service-qualified (`service.slot`) and unique per runtime.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::core::{Runtime, RuntimeInner};
use crate::error::{RuntimeError, WaitError};
use crate::services::{Service, ServiceRef, SignalHandler, SlotFn};
use crate::signals::{Message, Signal};
use crate::slots::poll::Poll;

/// Shared handle to a slot.
pub type SlotRef = Arc<Slot>;

/// Slot flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Delivered by a pool worker.
    Queued,
    /// Consumed by a dedicated waiting thread.
    Poll,
}

/// Addressable sink bound to one owning service.
pub struct Slot {
    name: String,
    service: Weak<Service>,
    runtime: Weak<RuntimeInner>,
    handler: Mutex<Option<Arc<dyn SignalHandler>>>,
    poll: Option<Poll>,
}

impl Slot {
    pub(crate) fn queued(
        name: String,
        service: Weak<Service>,
        runtime: Weak<RuntimeInner>,
        handler: Option<Arc<dyn SignalHandler>>,
    ) -> Self {
        Self {
            name,
            service,
            runtime,
            handler: Mutex::new(handler),
            poll: None,
        }
    }

    pub(crate) fn poll(
        name: String,
        service: Weak<Service>,
        runtime: Weak<RuntimeInner>,
        handler: Arc<dyn SignalHandler>,
    ) -> Self {
        Self {
            name,
            service,
            runtime,
            handler: Mutex::new(Some(handler)),
            poll: Some(Poll::new()),
        }
    }

    /// Qualified name (`service` for a primary slot, `service.slot` otherwise).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slot flavor.
    pub fn kind(&self) -> SlotKind {
        if self.poll.is_some() {
            SlotKind::Poll
        } else {
            SlotKind::Queued
        }
    }

    /// `true` for poll slots.
    pub fn is_poll(&self) -> bool {
        self.poll.is_some()
    }

    /// Owning service, unless it has already been dropped.
    pub fn service(&self) -> Option<ServiceRef> {
        self.service.upgrade()
    }

    /// `true` if this is the primary slot of its owning service.
    pub fn is_service(&self) -> bool {
        self.service()
            .is_some_and(|svc| std::ptr::eq(svc.slot().as_ref(), self))
    }

    /// Runtime this slot belongs to.
    pub fn runtime(&self) -> Option<Runtime> {
        self.runtime.upgrade().map(Runtime::from_inner)
    }

    /// Current handler.
    pub fn handler(&self) -> Option<Arc<dyn SignalHandler>> {
        self.handler.lock().clone()
    }

    /// Replaces the handler with a closure.
    pub fn set_handler<F>(&self, f: F)
    where
        F: Fn(&Runtime, &SlotRef, Option<&Signal>) -> Result<(), crate::HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.set_handler_arc(Some(SlotFn::arc(f)));
    }

    /// Replaces (or clears) the handler object.
    pub fn set_handler_arc(&self, handler: Option<Arc<dyn SignalHandler>>) {
        *self.handler.lock() = handler;
    }

    /// Emits a message to this slot; see [`Runtime::emit`].
    pub fn emit(self: &Arc<Self>, msg: Message<'_>) -> Result<(), RuntimeError> {
        self.runtime().ok_or(RuntimeError::Closed)?.emit(self, msg)
    }

    /// Emits a copied byte payload to this slot.
    pub fn emit_data(
        self: &Arc<Self>,
        kind: u8,
        session: u32,
        data: &[u8],
    ) -> Result<(), RuntimeError> {
        self.emit(Message::new(kind).with_session(session).with_data(data))
    }

    /// Emits a copied string payload to this slot.
    pub fn emit_str(self: &Arc<Self>, kind: u8, session: u32, s: &str) -> Result<(), RuntimeError> {
        self.emit(Message::new(kind).with_session(session).with_str(s))
    }

    /// Waits on this poll; see [`Runtime::wait`].
    pub fn wait(self: &Arc<Self>, timeout: Option<Duration>) -> Result<Signal, WaitError> {
        match self.runtime() {
            Some(rt) => rt.wait(self, timeout),
            None => Err(WaitError::Closed),
        }
    }

    pub(crate) fn as_poll(&self) -> Option<&Poll> {
        self.poll.as_ref()
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}
