//! # Runtime: shared state, configuration and protected calls.
//!
//! A [`Runtime`] is a cheap, cloneable handle to one runtime instance. Every
//! operation goes through it; there is no process-wide singleton, so several
//! independent runtimes can live in one process (and in one test binary).
//!
//! ## Architecture
//! ```text
//! Runtime ─► Arc<RuntimeInner>
//!              ├─ root: ServiceRef                     (counted, never booted)
//!              ├─ shared: Mutex<Shared>                (the global lock)
//!              │    ├─ registry   name → service | slot, preload table
//!              │    ├─ ready      VecDeque<ServiceRef> (scheduler input)
//!              │    ├─ pool       recycled signal nodes
//!              │    ├─ live       live-service count
//!              │    ├─ logger / monitor slots
//!              │    └─ config     string table
//!              ├─ wake: Condvar                        (idle workers)
//!              ├─ workers: Vec<JoinHandle>
//!              ├─ shutdown: CancellationToken
//!              └─ resolver: Option<Arc<dyn ModuleResolver>>
//! ```
//!
//! ## Lock order
//! The global lock is always taken before a service lock. Poll locks and slot
//! handler locks are leaves: nothing else is acquired while holding them.
//!
//! ## Example
//! ```rust
//! use std::sync::mpsc;
//! use std::time::Duration;
//! use slotvisor::{Runtime, RuntimeConfig, ServiceFn, Startup};
//!
//! let rt = Runtime::new(RuntimeConfig { threads: 2, ..RuntimeConfig::default() });
//!
//! let (tx, rx) = mpsc::channel();
//! let tx = std::sync::Mutex::new(tx);
//! rt.new_slot("inbox", move |_rt, _slot, sig| {
//!     if let Some(sig) = sig {
//!         let _ = tx.lock().unwrap().send(sig.as_str().map(str::to_owned));
//!     }
//!     Ok(())
//! })?;
//!
//! rt.require_with("greeter", ServiceFn::arc(|rt: &Runtime| {
//!     rt.emit_str("root.inbox", 0, 0, "hello")?;
//!     rt.close();
//!     Ok(Startup::Live)
//! }))?;
//!
//! rt.start()?;
//! let got = rx.recv_timeout(Duration::from_secs(5)).unwrap();
//! assert_eq!(got.as_deref(), Some("hello"));
//! rt.wait_close();
//! rt.close();
//! # Ok::<(), slotvisor::RuntimeError>(())
//! ```

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tokio_util::sync::CancellationToken;

use crate::context::{self, Cleanup};
use crate::core::alive::LiveCount;
use crate::core::builder::RuntimeBuilder;
use crate::core::config::{MAX_SERVICE_NAME, RuntimeConfig};
use crate::core::registry::{Entry, Registry};
use crate::core::scheduler;
use crate::core::shutdown::Shutdown;
use crate::error::{HandlerError, RuntimeError};
use crate::modules::{ModuleResolver, SearchPath};
use crate::services::{Boot, Lifecycle, Service, ServiceFn, ServiceHandler, ServiceRef, Startup};
use crate::signals::{Message, NodePool};
use crate::slots::SlotRef;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// State guarded by the global lock.
pub(crate) struct Shared {
    pub(crate) started: bool,
    pub(crate) stopping: bool,
    pub(crate) cfg: RuntimeConfig,
    pub(crate) registry: Registry,
    pub(crate) ready: VecDeque<ServiceRef>,
    pub(crate) pool: NodePool,
    pub(crate) live: LiveCount,
    pub(crate) logger: Option<SlotRef>,
    pub(crate) monitor: Option<SlotRef>,
    pub(crate) config: HashMap<String, String>,
}

/// Runtime instance behind every [`Runtime`] handle.
pub(crate) struct RuntimeInner {
    pub(crate) id: u64,
    pub(crate) root: ServiceRef,
    pub(crate) shared: Mutex<Shared>,
    pub(crate) wake: Condvar,
    pub(crate) workers: Mutex<Vec<JoinHandle<()>>>,
    pub(crate) shutdown: Shutdown,
    pub(crate) resolver: Option<Arc<dyn ModuleResolver>>,
}

/// Handle to a runtime instance; clones share the same instance.
#[derive(Clone)]
pub struct Runtime {
    pub(crate) inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Creates a runtime with the given configuration and no module resolver.
    pub fn new(cfg: RuntimeConfig) -> Self {
        RuntimeBuilder::new(cfg).build()
    }

    /// Returns a builder for a runtime with optional features.
    pub fn builder(cfg: RuntimeConfig) -> RuntimeBuilder {
        RuntimeBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: RuntimeConfig,
        resolver: Option<Arc<dyn ModuleResolver>>,
    ) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::new_cyclic(|weak: &Weak<RuntimeInner>| {
            let root = Service::new(
                &cfg.name,
                ServiceFn::arc(|_rt: &Runtime| Ok(Startup::Live)),
                weak.clone(),
            );
            {
                let mut st = root.state.lock();
                st.boot = Boot::Ready;
                st.lifecycle = Lifecycle::Sleeping;
                st.counted = true;
            }
            let shared = Shared {
                started: false,
                stopping: false,
                registry: Registry::new(&root),
                ready: VecDeque::new(),
                pool: NodePool::new(cfg.node_pool_capacity),
                live: LiveCount::new(),
                logger: None,
                monitor: None,
                config: HashMap::new(),
                cfg,
            };
            RuntimeInner {
                id,
                root,
                shared: Mutex::new(shared),
                wake: Condvar::new(),
                workers: Mutex::new(Vec::new()),
                shutdown: Shutdown::new(),
                resolver,
            }
        });
        tracing::debug!(runtime = id, root = %inner.root.name(), "runtime created");
        Self { inner }
    }

    pub(crate) fn from_inner(inner: Arc<RuntimeInner>) -> Self {
        Self { inner }
    }

    /// Process-unique id of this runtime instance.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The root service; the default source of signals emitted outside any service.
    pub fn root(&self) -> &ServiceRef {
        &self.inner.root
    }

    /// Service of the innermost protected call on this thread, else the root.
    pub fn current(&self) -> ServiceRef {
        context::current(self.id()).unwrap_or_else(|| Arc::clone(&self.inner.root))
    }

    /// `true` once [`start`](Self::start) ran.
    pub fn is_started(&self) -> bool {
        self.inner.shared.lock().started
    }

    /// `true` once the live-service count reached its terminal threshold.
    pub fn is_stopping(&self) -> bool {
        self.inner.shared.lock().stopping
    }

    /// Number of services currently keeping the runtime alive (root included).
    pub fn live_services(&self) -> usize {
        self.inner.shared.lock().live.get()
    }

    /// Token cancelled when the runtime flips to stopping.
    ///
    /// # Example
    /// ```rust,no_run
    /// # async fn demo(rt: slotvisor::Runtime) {
    /// rt.shutdown_token().cancelled().await;
    /// # }
    /// ```
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.token()
    }

    /// Sets the worker count used by [`start`](Self::start) (`0` = CPU count).
    pub fn set_threads(&self, threads: usize) -> Result<(), RuntimeError> {
        let mut shared = self.inner.shared.lock();
        if shared.started {
            return Err(RuntimeError::AlreadyStarted);
        }
        shared.cfg.threads = threads;
        Ok(())
    }

    /// Appends `;`-separated templates to the module search path.
    pub fn add_search_path(&self, path: &str) -> Result<(), RuntimeError> {
        let mut shared = self.inner.shared.lock();
        if shared.started {
            return Err(RuntimeError::AlreadyStarted);
        }
        shared.cfg.search_path.push(path);
        Ok(())
    }

    /// Current module search path.
    pub fn search_path(&self) -> SearchPath {
        self.inner.shared.lock().cfg.search_path.clone()
    }

    /// Spawns the worker pool and returns the number of workers started.
    ///
    /// Stops at the first failed spawn; fails only if no worker could be spawned.
    pub fn start(&self) -> Result<usize, RuntimeError> {
        let (threads, prefix) = {
            let mut shared = self.inner.shared.lock();
            if shared.started {
                return Err(RuntimeError::AlreadyStarted);
            }
            shared.started = true;
            (
                shared.cfg.worker_threads(),
                shared.cfg.thread_prefix().to_string(),
            )
        };

        let mut handles = Vec::with_capacity(threads);
        let mut last_error = None;
        for index in 0..threads {
            let name = format!("{prefix}-worker-{index}");
            let rt = self.clone();
            match thread::Builder::new()
                .name(name.clone())
                .spawn(move || scheduler::run_worker(rt, index))
            {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    tracing::error!(worker = index, error = %e, "failed to spawn worker");
                    last_error = Some(RuntimeError::SpawnFailed {
                        thread: name,
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        }

        let count = handles.len();
        self.inner.workers.lock().extend(handles);
        if count == 0 {
            if let Some(err) = last_error {
                return Err(err);
            }
        }
        tracing::debug!(runtime = self.id(), workers = count, "runtime started");
        Ok(count)
    }

    /// Blocks until the runtime stops and every worker has exited.
    ///
    /// Called from a worker thread, that worker is skipped.
    pub fn wait_close(&self) {
        {
            let mut shared = self.inner.shared.lock();
            while !shared.stopping {
                self.inner.wake.wait(&mut shared);
            }
        }
        let handles = std::mem::take(&mut *self.inner.workers.lock());
        let me = thread::current().id();
        for handle in handles {
            if handle.thread().id() == me {
                continue;
            }
            if handle.join().is_err() {
                tracing::warn!("worker terminated by panic");
            }
        }
    }

    /// Reads a process-wide configuration value.
    pub fn get_config(&self, key: &str) -> Option<String> {
        self.inner.shared.lock().config.get(key).cloned()
    }

    /// Sets a configuration value, replacing the previous one.
    pub fn set_config(&self, key: &str, value: &str) {
        self.inner
            .shared
            .lock()
            .config
            .insert(key.to_string(), value.to_string());
    }

    /// Registers a startup handler consumed by the first `require(name)`.
    ///
    /// Returns `false` (and drops `handler`) if `name` is already bound or preloaded.
    pub fn preload(
        &self,
        name: &str,
        handler: Arc<dyn ServiceHandler>,
    ) -> Result<bool, RuntimeError> {
        check_name(name, MAX_SERVICE_NAME)?;
        Ok(self.inner.shared.lock().registry.preload(name, handler))
    }

    /// Looks up a slot by qualified name; a service name yields its primary slot.
    pub fn slot(&self, name: &str) -> Option<SlotRef> {
        self.inner
            .shared
            .lock()
            .registry
            .get(name)
            .map(|entry| entry.slot())
    }

    /// Looks up a registered service by name.
    pub fn service(&self, name: &str) -> Option<ServiceRef> {
        match self.inner.shared.lock().registry.get(name) {
            Some(Entry::Service(svc)) => Some(Arc::clone(svc)),
            _ => None,
        }
    }

    /// Sends one line to the logger service, if one is running.
    pub fn log(&self, line: &str) {
        let logger = self.inner.shared.lock().logger.clone();
        if let Some(logger) = logger {
            if let Err(e) = self.emit(&logger, Message::new(0).with_str(line)) {
                tracing::trace!(error = %e, "log line dropped");
            }
        }
    }

    /// Formats and sends one line to the logger service; see [`log`](Self::log).
    pub fn log_fmt(&self, args: fmt::Arguments<'_>) {
        match args.as_str() {
            Some(s) => self.log(s),
            None => self.log(&args.to_string()),
        }
    }

    /// Runs `f` as a protected call on behalf of the current service.
    ///
    /// Failures and panics inside `f` run the cleanups registered through
    /// [`add_cleanup`](Self::add_cleanup) in reverse order and are returned here.
    pub fn pcall<T>(
        &self,
        f: impl FnOnce(&Runtime) -> Result<T, HandlerError>,
    ) -> Result<T, HandlerError> {
        context::protect(self, self.current(), || f(self))
    }

    /// Aborts the current protected call: `return Err(rt.discard())`.
    ///
    /// # Panics
    /// Outside any protected call of this runtime; that is a programming error.
    pub fn discard(&self) -> HandlerError {
        if !context::is_protected(self.id()) {
            tracing::error!(runtime = self.id(), "discard outside of a protected call");
            panic!("unprotected error");
        }
        HandlerError::Discarded
    }

    /// Registers a cleanup on the innermost protected call.
    ///
    /// It runs only if that call fails, in LIFO order with the other cleanups.
    pub fn add_cleanup(&self, f: impl FnOnce(&Runtime) + 'static) -> Result<(), RuntimeError> {
        context::push_cleanup(self.id(), Cleanup::new(f))
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("id", &self.inner.id)
            .field("root", &self.inner.root.name())
            .finish_non_exhaustive()
    }
}

/// Validates a service or slot name.
pub(crate) fn check_name(name: &str, max: usize) -> Result<(), RuntimeError> {
    if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(RuntimeError::InvalidName {
            name: name.to_string(),
        });
    }
    if name.len() > max {
        return Err(RuntimeError::NameTooLong {
            name: name.to_string(),
            max,
        });
    }
    Ok(())
}
