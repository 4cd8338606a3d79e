//! # slotvisor
//!
//! **Slotvisor** is an in-process actor runtime for Rust.
//!
//! Independently addressable *services*, each with private state, talk to each
//! other only through *signals* emitted to named *slots*. A fixed pool of OS
//! worker threads drains the services' signal queues; *poll* slots are consumed
//! synchronously by dedicated threads instead.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   service    │   │   service    │   │   service    │
//!     │    "echo"    │   │    "log"     │   │   "timer"    │
//!     │ echo.ping    │   │ (primary)    │   │ timer.tick ◄─┼── poll thread
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘    (wait loop)
//!            │ emit             │ emit             │ emit
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Runtime (explicit handle, no global state)                       │
//! │  - Registry   (name → service | slot, preload table)              │
//! │  - ready queue of services with pending signals                   │
//! │  - NodePool   (recycled signal nodes)                             │
//! │  - LiveCount  (services keeping the runtime alive)                │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     worker 0           worker 1     ...   worker N-1
//!   dispatch(svc):  take the whole queue, deliver each signal
//!                   (source hook, then slot handler), requeue or sleep
//! ```
//!
//! ### Lifecycle
//! ```text
//! require(name) ─► Initializing ─► startup handler (protected call)
//!                       │              ├─ Ok(Live) ─► Working, counted
//!                       │              ├─ Ok(Weak) ─► Working, not counted
//!                       │              └─ Err      ─► deleted, never visible
//!                       ▼
//!            Working ⇄ Sleeping   (queue empty ⇄ signal arrives)
//!                       │
//!            close ─► Stopping ─► drained & pending == 0 ─► deleted
//!                                                        └─► live -= 1
//!                                                            └─ terminal ─► runtime stopping
//! ```
//!
//! ### Protected calls
//! Every handler runs inside a protected call. Errors and panics are caught at
//! that boundary; cleanups registered with [`Runtime::add_cleanup`] run in LIFO
//! order. A failing signal handler never kills its service; a failing startup
//! handler deletes it.
//!
//! ## Features
//! | Area              | Description                                                      | Key types / traits                              |
//! |-------------------|------------------------------------------------------------------|-------------------------------------------------|
//! | **Runtime**       | Owns services, routes signals, runs the worker pool.             | [`Runtime`], [`RuntimeBuilder`]                 |
//! | **Services**      | Actors with a startup handler, slots, polls and a hook.          | [`ServiceHandler`], [`Service`], [`ServiceFn`]  |
//! | **Slots**         | Queued sinks and blocking polls.                                 | [`Slot`], [`SignalHandler`], [`SlotFn`]         |
//! | **Signals**       | Typed envelopes with copied or moved payloads.                   | [`Signal`], [`Message`]                         |
//! | **Interception**  | Per-source hook that may pre-empt slot handlers.                 | [`Intercept`], [`HookFn`]                       |
//! | **Modules**       | Search-path based service resolution.                            | [`ModuleResolver`], [`SearchPath`]              |
//! | **Monitoring**    | Built-in `monitor` service tracking alive services.              | [`MonitorTracker`]                              |
//! | **Errors**        | Typed errors and the closed status-code set.                     | [`RuntimeError`], [`HandlerError`], [`Status`]  |
//! | **Configuration** | Centralize runtime settings.                                     | [`RuntimeConfig`]                               |
//!
//! ## Optional features
//! - `logging`: exports a built-in `LogWriter` logger service that forwards lines to `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::{Mutex, mpsc};
//! use std::time::Duration;
//! use slotvisor::{Runtime, RuntimeConfig, ServiceFn, Startup};
//!
//! let rt = Runtime::new(RuntimeConfig { threads: 2, ..RuntimeConfig::default() });
//!
//! // echo: answers every "ping" on the caller's "pong" slot.
//! rt.require_with("echo", ServiceFn::arc(|rt: &Runtime| {
//!     rt.new_slot("ping", |rt, _slot, sig| {
//!         if let Some(sig) = sig {
//!             let reply = format!("{}.pong", sig.source().name());
//!             rt.emit_data(&reply, sig.kind(), sig.session(), sig.data().unwrap_or_default())?;
//!         }
//!         Ok(())
//!     })?;
//!     Ok(Startup::Live)
//! }))?;
//!
//! // root: a poll thread forwarding every answer to this thread.
//! let (tx, rx) = mpsc::channel();
//! let tx = Mutex::new(tx);
//! rt.new_poll("pong", move |rt, slot, _| {
//!     while let Ok(sig) = rt.wait(slot, None) {
//!         let _ = tx.lock().unwrap().send(sig.as_str().map(str::to_owned));
//!     }
//!     Ok(())
//! })?;
//!
//! rt.start()?;
//! rt.emit_str("echo.ping", 1, 0, "hi")?;
//! let got = rx.recv_timeout(Duration::from_secs(5)).unwrap();
//! assert_eq!(got.as_deref(), Some("hi"));
//!
//! // echo was the only live service: closing it stops the runtime.
//! rt.close_service(&rt.service("echo").unwrap());
//! rt.wait_close();
//! rt.close();
//! # Ok::<(), slotvisor::RuntimeError>(())
//! ```

mod context;
mod core;
mod error;
mod modules;
mod services;
mod signals;
mod slots;

// ---- Public re-exports ----

pub use core::{
    MAX_SERVICE_NAME, MAX_SLOT_NAME, MAX_THREADS, Runtime, RuntimeBuilder, RuntimeConfig,
    SlotTarget,
};
pub use error::{HandlerError, RuntimeError, Status, WaitError};
pub use modules::{
    DEFAULT_SEARCH_PATH, ENTRY_PREFIX, ModuleLoader, ModuleResolver, SearchPath,
    SearchPathResolver, StaticLoader,
};
pub use services::{
    HookFn, Intercept, Interception, Lifecycle, MONITOR_DELETED, MONITOR_STARTED, MonitorTracker,
    Service, ServiceFn, ServiceHandler, ServiceRef, SignalHandler, SlotFn, Startup,
};
pub use signals::{MAX_KIND, MAX_PAYLOAD, Message, Signal};
pub use slots::{Slot, SlotKind, SlotRef};

// Optional: expose a simple built-in logger service.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use services::LogWriter;
