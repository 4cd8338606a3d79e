//! # Worker pool scheduler.
//!
//! N OS threads pull ready services from the shared ready queue and drain each
//! service's signal queue in one batch.
//!
//! ## Worker loop
//! ```text
//! loop (global lock held):
//!   ├─ pop ready service ─► in_queue=false, busy=true
//!   │     ├─ runtime stopping? ─► notify_all (siblings observe it too)
//!   │     └─ unlock ─► dispatch(service) ─► relock
//!   ├─ queue empty & stopping ─► exit
//!   └─ wait on wake condvar
//!
//! dispatch(service):
//!   service lock: take the whole queue (O(1))
//!   for node in batch (no lock held):
//!       source hook ──Handled──► skip handler
//!            └──Pass / error──► slot handler
//!       recycle node, release source pending
//!   global + service lock:
//!       ├─ queue refilled      ─► back to the ready queue
//!       ├─ not stopping        ─► Sleeping
//!       └─ stopping, pending 0 ─► claim deletion ─► delete_service
//! ```
//!
//! ## Rules
//! - A service sits in the ready queue at most once (`in_queue`) and is drained
//!   by at most one worker at a time (`busy`).
//! - Handler failures are logged and never abort the rest of the batch.
//! - The logger slot is never routed through interception hooks.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use parking_lot::MutexGuard;

use crate::context;
use crate::core::runtime::{Runtime, RuntimeInner, Shared};
use crate::services::{Boot, Interception, Lifecycle, ServiceRef, ServiceState};
use crate::signals::SignalNode;
use crate::slots::SlotRef;

/// Puts an idle service on the ready queue and wakes one worker.
///
/// Both the global lock (`shared`) and the service lock (`st`) must be held.
pub(crate) fn schedule(
    inner: &RuntimeInner,
    shared: &mut Shared,
    svc: &ServiceRef,
    st: &mut ServiceState,
) {
    if st.in_queue || st.busy || st.deleted {
        return;
    }
    st.in_queue = true;
    shared.ready.push_back(Arc::clone(svc));
    inner.wake.notify_one();
}

/// Body of one pool worker thread.
pub(crate) fn run_worker(rt: Runtime, index: usize) {
    tracing::debug!(worker = index, "worker started");
    let inner = Arc::clone(&rt.inner);
    let mut shared = inner.shared.lock();
    loop {
        if let Some(svc) = shared.ready.pop_front() {
            {
                let mut st = svc.state.lock();
                st.in_queue = false;
                st.busy = true;
            }
            if shared.stopping {
                inner.wake.notify_all();
            }
            MutexGuard::unlocked(&mut shared, || rt.dispatch(&svc));
            continue;
        }
        if shared.stopping {
            break;
        }
        inner.wake.wait(&mut shared);
    }
    drop(shared);
    tracing::debug!(worker = index, "worker stopped");
}

impl Runtime {
    /// Drains the queue of a service claimed by this worker (`busy` is set).
    pub(crate) fn dispatch(&self, svc: &ServiceRef) {
        let batch = {
            let mut st = svc.state.lock();
            if st.deleted {
                st.busy = false;
                return;
            }
            std::mem::take(&mut st.queue)
        };

        let logger = self.inner.shared.lock().logger.clone();
        let mut spent = Vec::with_capacity(batch.len());
        for mut node in batch {
            self.deliver(svc, &node, logger.as_ref());
            let source = node.source().cloned();
            node.recycle();
            spent.push(node);
            if let Some(source) = source {
                self.release_pending(&source);
            }
        }

        let delete = {
            let mut shared = self.inner.shared.lock();
            shared.pool.absorb(spent);
            let mut st = svc.state.lock();
            st.busy = false;
            if !st.queue.is_empty() {
                schedule(&self.inner, &mut shared, svc, &mut st);
                false
            } else if st.lifecycle != Lifecycle::Stopping {
                st.lifecycle = Lifecycle::Sleeping;
                false
            } else if svc.pending.load(Ordering::Acquire) == 0 && !st.deleted {
                st.deleted = true;
                true
            } else {
                false
            }
        };
        if delete {
            self.delete_service(svc);
        }
    }

    /// Delivers one node: source hook first, then the target slot handler.
    fn deliver(&self, svc: &ServiceRef, node: &SignalNode, logger: Option<&SlotRef>) {
        let (Some(slot), Some(signal)) = (node.slot.as_ref(), node.signal.as_ref()) else {
            return;
        };

        let to_logger = logger.is_some_and(|l| Arc::ptr_eq(l, slot));
        let hook = if to_logger {
            None
        } else {
            signal.source().hook()
        };
        if let Some(hook) = hook {
            match context::protect(self, Arc::clone(svc), || {
                hook.intercept(self, slot, signal)
            }) {
                Ok(Interception::Handled) => return,
                Ok(Interception::Pass) => {}
                Err(e) => tracing::warn!(
                    service = %svc.name(),
                    slot = %slot.name(),
                    error = %e,
                    "interception hook failed"
                ),
            }
        }

        let Some(handler) = slot.handler() else {
            return;
        };
        if let Err(e) = context::protect(self, Arc::clone(svc), || {
            handler.on_signal(self, slot, Some(signal))
        }) {
            tracing::warn!(
                service = %svc.name(),
                slot = %slot.name(),
                error = %e,
                "signal handler failed"
            );
        }
    }

    /// Drops one in-flight signal from `source`'s pending count.
    ///
    /// When a stopping, started source reaches zero it goes back to the ready
    /// queue so a worker can delete it.
    pub(crate) fn release_pending(&self, source: &ServiceRef) {
        if source.pending.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }
        let mut shared = self.inner.shared.lock();
        let mut st = source.state.lock();
        if st.lifecycle == Lifecycle::Stopping && st.boot == Boot::Ready {
            schedule(&self.inner, &mut shared, source, &mut st);
        }
    }
}
