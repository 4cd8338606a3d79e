//! # Slot creation, signal emission and poll waits.
//!
//! ## Emit
//! ```text
//! emit(target, msg)
//!   ├─ validate kind (7 bits) / payload (24 bits)
//!   ├─ global lock: runtime stopping?  ─► Err(RuntimeStopping)
//!   │   service lock (source): stopping? ─► Err(ServiceStopping)
//!   │   source.pending += 1, take node from the pool
//!   ├─ fill node (borrowed payload copied + `\0`)
//!   └─ route by slot kind
//!        ├─ poll   ─► owner + poll lock: stopping? ─► Err(TargetStopping) │ push, wake waiter
//!        └─ queued ─► global + owner lock: stopping? ─► Err(TargetStopping)
//!                     push; Sleeping ─► Working + ready queue
//!   on error: node back to the pool, pending rolled back
//! ```
//!
//! ## Polls
//! A poll gets its own OS thread which runs the poll handler exactly once under
//! a protected call; the handler usually loops on [`Runtime::wait`]. The thread is
//! joined when the owning service is deleted.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use crate::context;
use crate::core::config::MAX_SLOT_NAME;
use crate::core::registry::Entry;
use crate::core::runtime::{Runtime, check_name};
use crate::core::scheduler::schedule;
use crate::error::{HandlerError, RuntimeError, WaitError};
use crate::services::{Lifecycle, ServiceRef, SignalHandler, SlotFn};
use crate::signals::{Message, Signal, SignalNode};
use crate::slots::{Poll, Slot, SlotRef};

/// Anything a signal can be emitted to.
pub trait SlotTarget {
    /// Resolves the target slot.
    fn resolve_slot(self, rt: &Runtime) -> Result<SlotRef, RuntimeError>;
}

impl SlotTarget for &SlotRef {
    fn resolve_slot(self, _rt: &Runtime) -> Result<SlotRef, RuntimeError> {
        Ok(Arc::clone(self))
    }
}

impl SlotTarget for SlotRef {
    fn resolve_slot(self, _rt: &Runtime) -> Result<SlotRef, RuntimeError> {
        Ok(self)
    }
}

impl SlotTarget for &ServiceRef {
    fn resolve_slot(self, _rt: &Runtime) -> Result<SlotRef, RuntimeError> {
        Ok(Arc::clone(self.slot()))
    }
}

impl SlotTarget for &str {
    fn resolve_slot(self, rt: &Runtime) -> Result<SlotRef, RuntimeError> {
        rt.slot(self).ok_or_else(|| RuntimeError::SlotNotFound {
            name: self.to_string(),
        })
    }
}

impl SlotTarget for &String {
    fn resolve_slot(self, rt: &Runtime) -> Result<SlotRef, RuntimeError> {
        self.as_str().resolve_slot(rt)
    }
}

impl Runtime {
    /// Creates a queued slot `<current service>.<name>`.
    pub fn new_slot<F>(&self, name: &str, f: F) -> Result<SlotRef, RuntimeError>
    where
        F: Fn(&Runtime, &SlotRef, Option<&Signal>) -> Result<(), HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.new_slot_with(name, Some(SlotFn::arc(f)))
    }

    /// Creates a queued slot with a handler object (or none, to be set later).
    pub fn new_slot_with(
        &self,
        name: &str,
        handler: Option<Arc<dyn SignalHandler>>,
    ) -> Result<SlotRef, RuntimeError> {
        let owner = self.current();
        let qualified = qualify(&owner, name)?;
        let slot = Arc::new(Slot::queued(
            qualified,
            Arc::downgrade(&owner),
            Arc::downgrade(&self.inner),
            handler,
        ));
        self.attach(&owner, &slot, false)?;
        Ok(slot)
    }

    /// Creates several queued slots on the current service.
    ///
    /// Names that cannot be registered are skipped; returns how many were created.
    pub fn register(&self, slots: &[(&str, Arc<dyn SignalHandler>)]) -> usize {
        let mut created = 0;
        for (name, handler) in slots {
            match self.new_slot_with(name, Some(Arc::clone(handler))) {
                Ok(_) => created += 1,
                Err(e) => tracing::warn!(slot = %name, error = %e, "slot not registered"),
            }
        }
        created
    }

    /// Creates a poll `<current service>.<name>` and starts its thread.
    pub fn new_poll<F>(&self, name: &str, f: F) -> Result<SlotRef, RuntimeError>
    where
        F: Fn(&Runtime, &SlotRef, Option<&Signal>) -> Result<(), HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.new_poll_with(name, SlotFn::arc(f))
    }

    /// Creates a poll with a handler object; see [`new_poll`](Self::new_poll).
    ///
    /// If the poll thread cannot be spawned the slot is unregistered again and
    /// `SpawnFailed` is returned.
    pub fn new_poll_with(
        &self,
        name: &str,
        handler: Arc<dyn SignalHandler>,
    ) -> Result<SlotRef, RuntimeError> {
        let owner = self.current();
        let qualified = qualify(&owner, name)?;
        let slot = Arc::new(Slot::poll(
            qualified.clone(),
            Arc::downgrade(&owner),
            Arc::downgrade(&self.inner),
            handler,
        ));
        self.attach(&owner, &slot, true)?;

        let thread_name = {
            let shared = self.inner.shared.lock();
            format!("{}-poll", shared.cfg.thread_prefix())
        };
        let rt = self.clone();
        let body = Arc::clone(&slot);
        let poll_owner = Arc::clone(&owner);
        let spawned = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || run_poll(rt, poll_owner, body));

        match spawned {
            Ok(handle) => {
                if let Some(poll) = slot.as_poll() {
                    poll.attach(handle);
                }
                tracing::debug!(slot = %qualified, "poll started");
                Ok(slot)
            }
            Err(e) => {
                self.detach(&owner, &slot);
                tracing::error!(slot = %qualified, error = %e, "failed to spawn poll thread");
                Err(RuntimeError::SpawnFailed {
                    thread: thread_name,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Registers `slot` under its qualified name and on its owner.
    fn attach(&self, owner: &ServiceRef, slot: &SlotRef, poll: bool) -> Result<(), RuntimeError> {
        let mut shared = self.inner.shared.lock();
        let mut st = owner.state.lock();
        if st.lifecycle == Lifecycle::Stopping {
            return Err(RuntimeError::ServiceStopping {
                service: owner.name().to_string(),
            });
        }
        shared
            .registry
            .insert(slot.name(), Entry::Slot(Arc::clone(slot)))?;
        if poll {
            st.polls.push(Arc::clone(slot));
        } else {
            st.slots.push(Arc::clone(slot));
        }
        Ok(())
    }

    fn detach(&self, owner: &ServiceRef, slot: &SlotRef) {
        let mut shared = self.inner.shared.lock();
        let mut st = owner.state.lock();
        shared.registry.remove_slot(slot);
        st.polls.retain(|p| !Arc::ptr_eq(p, slot));
        st.slots.retain(|s| !Arc::ptr_eq(s, slot));
    }

    /// Emits a signal to a slot, a service or a qualified slot name.
    ///
    /// The source is the message's explicit source, else the current service.
    pub fn emit(&self, target: impl SlotTarget, msg: Message<'_>) -> Result<(), RuntimeError> {
        let slot = target.resolve_slot(self)?;
        self.route(&slot, msg, true)
    }

    /// Emits a copy of `data` (with a trailing `\0`).
    pub fn emit_data(
        &self,
        target: impl SlotTarget,
        kind: u8,
        session: u32,
        data: &[u8],
    ) -> Result<(), RuntimeError> {
        self.emit(target, Message::new(kind).with_session(session).with_data(data))
    }

    /// Emits a copy of `s` (with a trailing `\0`).
    pub fn emit_str(
        &self,
        target: impl SlotTarget,
        kind: u8,
        session: u32,
        s: &str,
    ) -> Result<(), RuntimeError> {
        self.emit(target, Message::new(kind).with_session(session).with_str(s))
    }

    /// Emission core; `check_source` is off for runtime-generated notices.
    pub(crate) fn route(
        &self,
        slot: &SlotRef,
        mut msg: Message<'_>,
        check_source: bool,
    ) -> Result<(), RuntimeError> {
        msg.validate()?;
        let source = msg.source.take().unwrap_or_else(|| self.current());

        let mut node = {
            let mut shared = self.inner.shared.lock();
            if shared.stopping {
                return Err(RuntimeError::RuntimeStopping);
            }
            {
                let st = source.state.lock();
                if check_source && st.lifecycle == Lifecycle::Stopping {
                    return Err(RuntimeError::ServiceStopping {
                        service: source.name().to_string(),
                    });
                }
                source.pending.fetch_add(1, Ordering::AcqRel);
            }
            shared.pool.take()
        };
        node.fill(Arc::clone(slot), Arc::clone(&source), msg);

        let routed = match slot.as_poll() {
            Some(poll) => offer(slot, poll, node),
            None => self.enqueue(slot, node),
        };
        if let Err(node) = routed {
            self.inner.shared.lock().pool.put(node);
            self.release_pending(&source);
            return Err(RuntimeError::TargetStopping {
                slot: slot.name().to_string(),
            });
        }
        Ok(())
    }

    /// Appends a node to the owning service's queue; hands it back if stopping.
    fn enqueue(&self, slot: &SlotRef, node: Box<SignalNode>) -> Result<(), Box<SignalNode>> {
        let Some(owner) = slot.service() else {
            return Err(node);
        };
        let mut shared = self.inner.shared.lock();
        let mut st = owner.state.lock();
        if st.lifecycle == Lifecycle::Stopping || st.deleted {
            return Err(node);
        }
        st.queue.push_back(node);
        if st.lifecycle == Lifecycle::Sleeping {
            st.lifecycle = Lifecycle::Working;
            schedule(&self.inner, &mut shared, &owner, &mut st);
        }
        Ok(())
    }

    /// Takes one signal from a poll, blocking up to `timeout` (`None` = forever).
    ///
    /// - `Ok(signal)` when one was buffered or arrived in time
    /// - `Err(Timeout)` when the deadline passed; retry is possible
    /// - `Err(Closed)` when the poll stopped and its queue is empty
    /// - `Err(NotAPoll)` for queued slots
    pub fn wait(&self, slot: &SlotRef, timeout: Option<Duration>) -> Result<Signal, WaitError> {
        let poll = slot.as_poll().ok_or_else(|| WaitError::NotAPoll {
            slot: slot.name().to_string(),
        })?;
        let mut node = poll.wait(timeout)?;
        let signal = node.signal.take();
        self.inner.shared.lock().pool.put(node);

        let signal = signal.ok_or(WaitError::Closed)?;
        self.release_pending(signal.source());
        Ok(signal)
    }

    /// [`wait`](Self::wait) with a millisecond timeout: `0` polls, negative blocks.
    pub fn wait_ms(&self, slot: &SlotRef, ms: i64) -> Result<Signal, WaitError> {
        let timeout = u64::try_from(ms).ok().map(Duration::from_millis);
        self.wait(slot, timeout)
    }
}

/// Body of a poll thread: run the handler once, then mark the poll finished.
fn run_poll(rt: Runtime, owner: ServiceRef, slot: SlotRef) {
    if let Some(handler) = slot.handler() {
        if let Err(e) = context::protect(&rt, owner, || handler.on_signal(&rt, &slot, None)) {
            tracing::warn!(slot = %slot.name(), error = %e, "poll handler failed");
        }
    }
    if let Some(poll) = slot.as_poll() {
        poll.finish();
    }
    tracing::debug!(slot = %slot.name(), "poll finished");
}

/// Pushes a node onto a poll unless the poll or its owner is stopping.
fn offer(slot: &SlotRef, poll: &Poll, node: Box<SignalNode>) -> Result<(), Box<SignalNode>> {
    let Some(owner) = slot.service() else {
        return Err(node);
    };
    let st = owner.state.lock();
    if st.lifecycle == Lifecycle::Stopping || st.deleted {
        return Err(node);
    }
    poll.push(node)
}

/// Builds `service.name` and checks the slot name limits.
fn qualify(owner: &ServiceRef, name: &str) -> Result<String, RuntimeError> {
    check_name(name, MAX_SLOT_NAME)?;
    if name.contains('.') {
        return Err(RuntimeError::InvalidName {
            name: name.to_string(),
        });
    }
    let qualified = format!("{}.{}", owner.name(), name);
    if qualified.len() > MAX_SLOT_NAME {
        return Err(RuntimeError::NameTooLong {
            name: qualified,
            max: MAX_SLOT_NAME,
        });
    }
    Ok(qualified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RuntimeConfig;

    fn runtime() -> Runtime {
        Runtime::new(RuntimeConfig {
            threads: 1,
            ..RuntimeConfig::default()
        })
    }

    #[test]
    fn slot_names_are_qualified_and_unique() {
        let rt = runtime();
        let slot = rt.new_slot("pong", |_, _, _| Ok(())).unwrap();
        assert_eq!(slot.name(), "root.pong");
        assert!(!slot.is_service());
        assert_eq!(
            rt.new_slot("pong", |_, _, _| Ok(())).unwrap_err(),
            RuntimeError::NameTaken {
                name: "root.pong".into()
            }
        );
        assert_eq!(
            rt.new_slot("a.b", |_, _, _| Ok(())).unwrap_err().as_label(),
            "runtime_invalid_name"
        );
        let long = "x".repeat(MAX_SLOT_NAME);
        assert_eq!(
            rt.new_slot(&long, |_, _, _| Ok(())).unwrap_err().as_label(),
            "runtime_name_too_long"
        );
    }

    #[test]
    fn emit_to_unknown_name_fails() {
        let rt = runtime();
        assert_eq!(
            rt.emit_str("nobody.home", 0, 0, "x"),
            Err(RuntimeError::SlotNotFound {
                name: "nobody.home".into()
            })
        );
    }

    #[test]
    fn queued_signals_wait_for_workers() {
        let rt = runtime();
        let slot = rt.new_slot_with("inbox", None).unwrap();
        rt.emit_str(&slot, 1, 0, "a").unwrap();
        rt.emit_str("root.inbox", 1, 0, "b").unwrap();
        assert_eq!(rt.root().queued(), 2);
        assert_eq!(rt.root().pending(), 2);
        assert_eq!(rt.root().lifecycle(), Lifecycle::Working);
    }

    #[test]
    fn waiting_on_a_queued_slot_is_rejected() {
        let rt = runtime();
        let slot = rt.new_slot_with("inbox", None).unwrap();
        assert_eq!(
            rt.wait_ms(&slot, 0).unwrap_err(),
            WaitError::NotAPoll {
                slot: "root.inbox".into()
            }
        );
    }

    #[test]
    fn invalid_messages_do_not_touch_pending() {
        let rt = runtime();
        let slot = rt.new_slot_with("inbox", None).unwrap();
        assert_eq!(
            rt.emit(&slot, Message::new(200)),
            Err(RuntimeError::InvalidKind { kind: 200 })
        );
        assert_eq!(rt.root().pending(), 0);
        assert_eq!(rt.root().queued(), 0);
    }

    #[test]
    fn register_counts_created_slots() {
        let rt = runtime();
        let h: Arc<dyn SignalHandler> = SlotFn::arc(|_: &Runtime, _: &SlotRef, _: Option<&Signal>| Ok(()));
        let created = rt.register(&[("a", Arc::clone(&h)), ("b", Arc::clone(&h)), ("a", h)]);
        assert_eq!(created, 2);
        assert_eq!(rt.root().slot_names(), vec!["root.a", "root.b"]);
    }
}
