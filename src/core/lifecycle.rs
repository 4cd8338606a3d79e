//! # Service lifecycle: require, close and teardown.
//!
//! ## Require
//! ```text
//! require(name)
//!   ├─ registry hit (service)  ─► boot(existing)
//!   ├─ registry hit (slot)     ─► Err(NameTaken)
//!   └─ miss ─► explicit handler | preload (taken once) | resolver
//!                └─► register Initializing service ─► boot(new)
//!
//! boot(svc)                              (service lock)
//!   ├─ Ready    ─► Ok(svc)
//!   ├─ Failed   ─► Err(StartupFailed)
//!   ├─ Running  ─► wait on `booted`      (unless the caller is booting itself)
//!   └─ Pending  ─► claim: Running, lifecycle Working
//!        └─► protect(start)
//!              ├─ Err  ─► Failed ─► delete_service          (never counted)
//!              └─ Ok   ─► Ready, live += 1 unless Weak ─► Sleeping | ready queue
//!                        └─► monitor notice (kind 0)
//! ```
//!
//! ## Teardown
//! ```text
//! delete_service(svc)                    (deletion already claimed)
//!   ├─ primary slot handler(None)        teardown notification
//!   ├─ unregister name + slots + polls
//!   ├─ stop polls ─► drop their queues ─► join poll threads
//!   ├─ monitor notice (kind 1)
//!   └─ live -= 1 ─► terminal? ─► runtime stopping, wake workers, cancel token
//! ```

use std::sync::Arc;

use crate::context;
use crate::core::config::MAX_SERVICE_NAME;
use crate::core::registry::Entry;
use crate::core::runtime::{Runtime, Shared, check_name};
use crate::core::scheduler::schedule;
use crate::error::{HandlerError, RuntimeError};
use crate::services::{
    Boot, Lifecycle, MONITOR_DELETED, MONITOR_STARTED, Service, ServiceHandler, ServiceRef,
    Startup,
};
use crate::signals::{Message, SignalNode};

/// Name that makes a started service the runtime logger.
const LOGGER_NAME: &str = "log";

/// Name that makes a started service the runtime monitor.
const MONITOR_NAME: &str = "monitor";

impl Runtime {
    /// Returns the service registered as `name`, creating and starting it first
    /// if needed.
    ///
    /// The startup handler comes from the preload table or, failing that, from
    /// the module resolver. Requiring an existing service never reruns its
    /// startup; concurrent callers wait until the first one finished it.
    pub fn require(&self, name: &str) -> Result<ServiceRef, RuntimeError> {
        let svc = self.bind(name, None)?;
        self.boot(&svc)
    }

    /// Like [`require`](Self::require), with an explicit startup handler used
    /// when the service does not exist yet.
    pub fn require_with(
        &self,
        name: &str,
        handler: Arc<dyn ServiceHandler>,
    ) -> Result<ServiceRef, RuntimeError> {
        let svc = self.bind(name, Some(handler))?;
        self.boot(&svc)
    }

    /// Closes the current service, or tears the runtime down.
    ///
    /// - Inside a handler: the current service stops accepting signals, drains
    ///   what is queued and gets deleted.
    /// - Outside any handler, once the runtime is stopping: joins the workers
    ///   and deletes every remaining service.
    pub fn close(&self) {
        if let Some(svc) = context::current(self.id()) {
            self.close_service(&svc);
            return;
        }
        let stopping = {
            let shared = self.inner.shared.lock();
            if !shared.stopping {
                self.inner.wake.notify_all();
            }
            shared.stopping
        };
        if stopping {
            self.wait_close();
            self.destroy();
        }
    }

    /// Moves `svc` to `Stopping`; it is deleted once drained.
    pub fn close_service(&self, svc: &ServiceRef) {
        let mut shared = self.inner.shared.lock();
        let mut st = svc.state.lock();
        if st.deleted || st.lifecycle == Lifecycle::Stopping {
            return;
        }
        let sleeping = st.lifecycle == Lifecycle::Sleeping;
        st.lifecycle = Lifecycle::Stopping;
        if sleeping {
            schedule(&self.inner, &mut shared, svc, &mut st);
        }
        tracing::debug!(service = %svc.name(), "service closing");
    }

    /// Finds or registers the service bound to `name`.
    fn bind(
        &self,
        name: &str,
        explicit: Option<Arc<dyn ServiceHandler>>,
    ) -> Result<ServiceRef, RuntimeError> {
        check_name(name, MAX_SERVICE_NAME)?;
        let path = {
            let mut shared = self.inner.shared.lock();
            if let Some(found) = lookup(&shared, name)? {
                return Ok(found);
            }
            let handler = explicit.or_else(|| shared.registry.take_preload(name));
            if let Some(handler) = handler {
                return self.insert_service(&mut shared, name, handler);
            }
            shared.cfg.search_path.clone()
        };

        let resolved = self
            .inner
            .resolver
            .as_ref()
            .and_then(|r| r.resolve(name, &path))
            .ok_or_else(|| RuntimeError::ServiceNotFound {
                name: name.to_string(),
            })?;

        let mut shared = self.inner.shared.lock();
        if let Some(found) = lookup(&shared, name)? {
            return Ok(found);
        }
        self.insert_service(&mut shared, name, resolved)
    }

    fn insert_service(
        &self,
        shared: &mut Shared,
        name: &str,
        handler: Arc<dyn ServiceHandler>,
    ) -> Result<ServiceRef, RuntimeError> {
        let svc = Service::new(name, handler, Arc::downgrade(&self.inner));
        shared
            .registry
            .insert(name, Entry::Service(Arc::clone(&svc)))?;
        tracing::debug!(service = %name, "service registered");
        Ok(svc)
    }

    /// Runs the startup handler once; other callers wait for its outcome.
    fn boot(&self, svc: &ServiceRef) -> Result<ServiceRef, RuntimeError> {
        // A caller inside its own startup never blocks on another startup:
        // two services requiring each other from different threads would
        // otherwise wait on each other forever.
        let caller_booting = context::current(self.id())
            .is_some_and(|cur| cur.state.lock().boot == Boot::Running);
        let closed_early = {
            let mut st = svc.state.lock();
            loop {
                let boot = st.boot;
                match boot {
                    Boot::Ready => return Ok(Arc::clone(svc)),
                    Boot::Failed => {
                        return Err(RuntimeError::StartupFailed {
                            name: svc.name().to_string(),
                            reason: "startup failed".to_string(),
                        });
                    }
                    Boot::Running if caller_booting => return Ok(Arc::clone(svc)),
                    Boot::Running => svc.booted.wait(&mut st),
                    Boot::Pending if st.lifecycle == Lifecycle::Stopping => {
                        st.boot = Boot::Failed;
                        st.deleted = true;
                        break true;
                    }
                    Boot::Pending => {
                        st.boot = Boot::Running;
                        st.lifecycle = Lifecycle::Working;
                        break false;
                    }
                }
            }
        };
        if closed_early {
            svc.booted.notify_all();
            self.delete_service(svc);
            return Err(RuntimeError::StartupFailed {
                name: svc.name().to_string(),
                reason: "closed before startup".to_string(),
            });
        }

        let requirer = self.current();
        tracing::debug!(service = %svc.name(), requirer = %requirer.name(), "service starting");
        let outcome = match svc.take_handler() {
            Some(handler) => context::protect(self, Arc::clone(svc), || handler.start(self)),
            None => Err(HandlerError::fail("startup handler already consumed")),
        };

        let startup = match outcome {
            Ok(startup) => startup,
            Err(e) => {
                {
                    let mut st = svc.state.lock();
                    st.boot = Boot::Failed;
                    st.lifecycle = Lifecycle::Stopping;
                    st.deleted = true;
                }
                svc.booted.notify_all();
                tracing::warn!(service = %svc.name(), error = %e, "service failed to start");
                self.delete_service(svc);
                return Err(RuntimeError::StartupFailed {
                    name: svc.name().to_string(),
                    reason: e.as_message(),
                });
            }
        };

        let weak = startup == Startup::Weak;
        let monitor = {
            let mut shared = self.inner.shared.lock();
            let mut st = svc.state.lock();
            st.weak = weak;
            if !weak {
                st.counted = true;
                shared.live.admit();
            }
            st.boot = Boot::Ready;
            if st.lifecycle == Lifecycle::Stopping || !st.queue.is_empty() {
                schedule(&self.inner, &mut shared, svc, &mut st);
            } else {
                st.lifecycle = Lifecycle::Sleeping;
            }
            drop(st);

            let monitor = shared.monitor.clone();
            match svc.name() {
                LOGGER_NAME => shared.logger = Some(Arc::clone(svc.slot())),
                MONITOR_NAME => shared.monitor = Some(Arc::clone(svc.slot())),
                _ => {}
            }
            monitor
        };
        svc.booted.notify_all();
        tracing::debug!(service = %svc.name(), status = startup.status().code(), "service started");

        if let Some(monitor) = monitor {
            let notice = Message::new(MONITOR_STARTED)
                .with_str(svc.name())
                .with_source(requirer);
            if let Err(e) = self.route(&monitor, notice, false) {
                tracing::trace!(error = %e, "monitor notice dropped");
            }
        }
        Ok(Arc::clone(svc))
    }

    /// Tears down a service whose deletion has been claimed (`deleted` set).
    pub(crate) fn delete_service(&self, svc: &ServiceRef) {
        if let Some(handler) = svc.slot().handler() {
            if let Err(e) = context::protect(self, Arc::clone(svc), || {
                handler.on_signal(self, svc.slot(), None)
            }) {
                tracing::warn!(service = %svc.name(), error = %e, "teardown handler failed");
            }
        }

        let (slots, polls, queue, announced, counted, monitor) = {
            let mut shared = self.inner.shared.lock();
            let mut st = svc.state.lock();
            st.lifecycle = Lifecycle::Stopping;
            st.hook = None;
            let slots = std::mem::take(&mut st.slots);
            let polls = std::mem::take(&mut st.polls);
            let queue = std::mem::take(&mut st.queue);
            let announced = st.boot == Boot::Ready;
            let counted = std::mem::replace(&mut st.counted, false);
            drop(st);

            shared.registry.remove_service(svc);
            for slot in slots.iter().chain(polls.iter()) {
                shared.registry.remove_slot(slot);
            }
            if shared
                .logger
                .as_ref()
                .is_some_and(|l| Arc::ptr_eq(l, svc.slot()))
            {
                shared.logger = None;
            }
            if shared
                .monitor
                .as_ref()
                .is_some_and(|m| Arc::ptr_eq(m, svc.slot()))
            {
                shared.monitor = None;
            }
            let monitor = if announced {
                shared.monitor.clone()
            } else {
                None
            };
            (slots, polls, queue, announced, counted, monitor)
        };

        let mut dropped: Vec<Box<SignalNode>> = queue.into_iter().collect();
        for slot in &polls {
            if let Some(poll) = slot.as_poll() {
                dropped.extend(poll.stop());
            }
        }
        self.discard_nodes(dropped);
        for slot in &polls {
            if let Some(poll) = slot.as_poll() {
                poll.join();
            }
        }

        for slot in slots.iter().chain(polls.iter()) {
            slot.set_handler_arc(None);
        }
        svc.slot().set_handler_arc(None);
        drop(svc.take_handler());
        svc.clear_data();

        if let Some(monitor) = monitor {
            let notice = Message::new(MONITOR_DELETED)
                .with_str(svc.name())
                .with_source(Arc::clone(&self.inner.root));
            if let Err(e) = self.route(&monitor, notice, false) {
                tracing::trace!(error = %e, "monitor notice dropped");
            }
        }

        if counted {
            let terminal = {
                let mut shared = self.inner.shared.lock();
                let root_passive = {
                    let root = &self.inner.root;
                    root.state.lock().counted && root.slot().handler().is_none()
                };
                let terminal = shared.live.release(root_passive) && !shared.stopping;
                if terminal {
                    shared.stopping = true;
                    self.inner.wake.notify_all();
                }
                terminal
            };
            if terminal {
                self.inner.shutdown.trigger();
            }
        }
        tracing::debug!(service = %svc.name(), announced, counted, "service deleted");
    }

    /// Returns undelivered nodes to the pool and releases their sources.
    fn discard_nodes(&self, nodes: Vec<Box<SignalNode>>) {
        if nodes.is_empty() {
            return;
        }
        let sources: Vec<ServiceRef> = nodes.iter().filter_map(|n| n.source().cloned()).collect();
        {
            let mut shared = self.inner.shared.lock();
            for node in nodes {
                shared.pool.put(node);
            }
        }
        for source in &sources {
            self.release_pending(source);
        }
    }

    /// Deletes every remaining service (root last) and clears all tables.
    fn destroy(&self) {
        let mut services = self.inner.shared.lock().registry.services();
        services.sort_by_key(|svc| Arc::ptr_eq(svc, &self.inner.root));
        for svc in &services {
            let claimed = {
                let mut st = svc.state.lock();
                if st.deleted {
                    false
                } else {
                    st.deleted = true;
                    st.lifecycle = Lifecycle::Stopping;
                    true
                }
            };
            if claimed {
                self.delete_service(svc);
            }
        }

        let mut shared = self.inner.shared.lock();
        shared.registry.clear();
        shared.ready.clear();
        shared.pool.clear();
        shared.logger = None;
        shared.monitor = None;
        tracing::debug!(runtime = self.id(), services = services.len(), "runtime destroyed");
    }
}

/// Registry lookup shared by both `bind` passes.
fn lookup(shared: &Shared, name: &str) -> Result<Option<ServiceRef>, RuntimeError> {
    if shared.stopping {
        return Err(RuntimeError::RuntimeStopping);
    }
    match shared.registry.get(name) {
        Some(Entry::Service(svc)) => Ok(Some(Arc::clone(svc))),
        Some(Entry::Slot(_)) => Err(RuntimeError::NameTaken {
            name: name.to_string(),
        }),
        None => Ok(None),
    }
}
