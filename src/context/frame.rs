//! # Per-thread protected-call frames.
//!
//! Every protected call (service startup, signal delivery, teardown, poll body,
//! user-level [`pcall`](crate::Runtime::pcall)) pushes a [`Frame`] onto a
//! thread-local stack and pops it on every exit path.
//!
//! ## Architecture
//! ```text
//! protect(rt, service, f)
//!   ├─► push Frame { runtime, current: service, cleanups: [] }
//!   ├─► catch_unwind(f)
//!   │     ├─ Ok(v)      ─► drop cleanups unrun ─► pop ─► Ok(v)
//!   │     ├─ Err(e)     ─► run cleanups LIFO   ─► pop ─► Err(e)
//!   │     └─ panic(p)   ─► run cleanups LIFO   ─► pop ─► Err(Panicked)
//! ```
//!
//! ## Rules
//! - Strict stack discipline per OS thread; the guard pops even if a cleanup panics.
//! - Frames are tagged with the runtime id, so independent runtimes can nest
//!   protected calls on the same thread without seeing each other's frames.
//! - No `RefCell` borrow is held while user code runs.

use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};

use crate::context::cleanup::Cleanup;
use crate::core::Runtime;
use crate::error::{HandlerError, RuntimeError};
use crate::services::ServiceRef;

thread_local! {
    /// Innermost frame is the last element.
    static FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// One protected-call frame.
struct Frame {
    runtime: u64,
    current: ServiceRef,
    cleanups: Vec<Cleanup>,
}

/// Pops the innermost frame on drop.
struct FrameGuard;

impl Drop for FrameGuard {
    fn drop(&mut self) {
        FRAMES.with(|frames| {
            frames.borrow_mut().pop();
        });
    }
}

/// Runs `f` as a protected call on behalf of `current`.
///
/// Errors and panics raised by `f` are caught here, the frame's cleanup stack
/// is executed in LIFO order, and the failure is returned as a [`HandlerError`].
pub(crate) fn protect<T>(
    rt: &Runtime,
    current: ServiceRef,
    f: impl FnOnce() -> Result<T, HandlerError>,
) -> Result<T, HandlerError> {
    FRAMES.with(|frames| {
        frames.borrow_mut().push(Frame {
            runtime: rt.id(),
            current,
            cleanups: Vec::new(),
        })
    });
    let _guard = FrameGuard;

    let result = match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(HandlerError::Panicked {
            info: panic_message(payload.as_ref()),
        }),
    };

    if result.is_err() {
        unwind_cleanups(rt);
    }
    result
}

/// Runs the innermost frame's cleanups until none are left.
///
/// Cleanups registered while unwinding are executed as well.
fn unwind_cleanups(rt: &Runtime) {
    loop {
        let next = FRAMES.with(|frames| {
            frames
                .borrow_mut()
                .last_mut()
                .and_then(|frame| frame.cleanups.pop())
        });
        let Some(cleanup) = next else { break };
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| cleanup.run(rt))) {
            tracing::warn!(
                info = %panic_message(payload.as_ref()),
                "cleanup handler panicked"
            );
        }
    }
}

/// Service of the innermost frame that belongs to runtime `id`.
pub(crate) fn current(id: u64) -> Option<ServiceRef> {
    FRAMES.with(|frames| {
        frames
            .borrow()
            .iter()
            .rev()
            .find(|frame| frame.runtime == id)
            .map(|frame| frame.current.clone())
    })
}

/// `true` if this thread is inside a protected call of runtime `id`.
pub(crate) fn is_protected(id: u64) -> bool {
    FRAMES.with(|frames| frames.borrow().iter().any(|frame| frame.runtime == id))
}

/// Pushes a cleanup onto the innermost frame of runtime `id`.
pub(crate) fn push_cleanup(id: u64, cleanup: Cleanup) -> Result<(), RuntimeError> {
    FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        match frames.iter_mut().rev().find(|frame| frame.runtime == id) {
            Some(frame) => {
                frame.cleanups.push(cleanup);
                Ok(())
            }
            None => Err(RuntimeError::NoContext),
        }
    })
}

/// Renders a caught panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
