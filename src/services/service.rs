//! # Service: actor with a private signal queue and a lifecycle.
//!
//! A service *is* a slot: its primary slot carries the service name and points
//! back to the service itself. Sub-slots are named `service.slot`.
//!
//! ## Lifecycle
//! ```text
//!   Initializing ──► Working ⇄ Sleeping
//!        │              │         │
//!        └──────────────┴─────────┴──► Stopping ──► deleted
//! ```
//!
//! ## Rules
//! - Only the thread that wins the `Initializing → Working` transition (under the
//!   service lock) runs the startup handler.
//! - The pending queue is drained by at most one worker at a time (`in_queue`/`busy`).
//! - A Stopping service accepts no new signals and is deleted once its queue is
//!   empty and its in-flight `pending` count is zero.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex};

use crate::core::RuntimeInner;
use crate::services::handler::{Intercept, ServiceHandler};
use crate::signals::SignalQueue;
use crate::slots::{Slot, SlotRef};

/// Shared handle to a service.
pub type ServiceRef = Arc<Service>;

/// Lifecycle states of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created, startup handler not run yet; not eligible for scheduling.
    Initializing,
    /// Running or queued for dispatch.
    Working,
    /// Idle with an empty queue.
    Sleeping,
    /// Closing: drains what is queued, then gets deleted.
    Stopping,
}

/// Progress of the startup handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Boot {
    Pending,
    Running,
    Ready,
    Failed,
}

/// State protected by the service lock.
pub(crate) struct ServiceState {
    pub(crate) lifecycle: Lifecycle,
    pub(crate) boot: Boot,
    pub(crate) queue: SignalQueue,
    pub(crate) slots: Vec<SlotRef>,
    pub(crate) polls: Vec<SlotRef>,
    pub(crate) hook: Option<Arc<dyn Intercept>>,
    /// Startup returned `Weak`.
    pub(crate) weak: bool,
    /// Included in the live-service count.
    pub(crate) counted: bool,
    /// Sitting in the ready queue.
    pub(crate) in_queue: bool,
    /// A worker is draining the queue right now.
    pub(crate) busy: bool,
    /// Deletion has been claimed.
    pub(crate) deleted: bool,
}

/// Actor owned by a runtime.
pub struct Service {
    slot: SlotRef,
    /// Startup handler; taken by the one boot that runs it.
    handler: Mutex<Option<Arc<dyn ServiceHandler>>>,
    pub(crate) state: Mutex<ServiceState>,
    pub(crate) booted: Condvar,
    pub(crate) pending: AtomicU32,
    data: Mutex<Option<Arc<dyn Any + Send + Sync>>>,
}

impl Service {
    /// Creates a service in `Initializing` state together with its primary slot.
    pub(crate) fn new(
        name: &str,
        handler: Arc<dyn ServiceHandler>,
        runtime: Weak<RuntimeInner>,
    ) -> ServiceRef {
        Arc::new_cyclic(|me: &Weak<Service>| Service {
            slot: Arc::new(Slot::queued(name.to_string(), me.clone(), runtime, None)),
            handler: Mutex::new(Some(handler)),
            state: Mutex::new(ServiceState {
                lifecycle: Lifecycle::Initializing,
                boot: Boot::Pending,
                queue: SignalQueue::new(),
                slots: Vec::new(),
                polls: Vec::new(),
                hook: None,
                weak: false,
                counted: false,
                in_queue: false,
                busy: false,
                deleted: false,
            }),
            booted: Condvar::new(),
            pending: AtomicU32::new(0),
            data: Mutex::new(None),
        })
    }

    /// Service name (also the name of its primary slot).
    pub fn name(&self) -> &str {
        self.slot.name()
    }

    /// Primary slot; signals emitted to it are handled by its slot handler.
    pub fn slot(&self) -> &SlotRef {
        &self.slot
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lock().lifecycle
    }

    /// `true` once the service started with [`Startup::Weak`](crate::Startup::Weak).
    pub fn is_weak(&self) -> bool {
        self.state.lock().weak
    }

    /// Signals emitted by this service that have not been delivered yet.
    pub fn pending(&self) -> u32 {
        self.pending.load(Ordering::Acquire)
    }

    /// Number of signals waiting in this service's queue.
    pub fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Names of the sub-slots and polls owned by this service.
    pub fn slot_names(&self) -> Vec<String> {
        let st = self.state.lock();
        st.slots
            .iter()
            .chain(st.polls.iter())
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Current interception hook.
    pub fn hook(&self) -> Option<Arc<dyn Intercept>> {
        self.state.lock().hook.clone()
    }

    /// Installs (or removes) the interception hook for signals this service emits.
    pub fn set_hook(&self, hook: Option<Arc<dyn Intercept>>) {
        self.state.lock().hook = hook;
    }

    /// Typed user data attached to this service.
    pub fn data<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.data.lock().clone()?.downcast::<T>().ok()
    }

    /// Attaches typed user data, replacing any previous value.
    pub fn set_data<T: Any + Send + Sync>(&self, data: Arc<T>) {
        *self.data.lock() = Some(data);
    }

    pub(crate) fn clear_data(&self) {
        *self.data.lock() = None;
    }

    pub(crate) fn take_handler(&self) -> Option<Arc<dyn ServiceHandler>> {
        self.handler.lock().take()
    }

    /// `true` for the same service instance.
    pub fn ptr_eq(a: &Service, b: &Service) -> bool {
        std::ptr::eq(a, b)
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name())
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}
