//! # Poll: slot consumed synchronously by a dedicated thread.
//!
//! A poll owns a private FIFO of undelivered signals, a condition variable and
//! one OS thread that runs the poll handler to completion exactly once. The
//! handler typically loops on [`Runtime::wait`](crate::Runtime::wait).
//!
//! ## Wait semantics
//! ```text
//! wait(timeout)
//!   ├─ queue non-empty          ─► Ok(signal)
//!   ├─ stopping & queue empty   ─► Err(Closed)      (nothing will ever arrive)
//!   ├─ timeout == 0             ─► Err(Timeout)
//!   └─ block on condvar (until deadline, or forever for `None`)
//!        └─ re-check after every wake
//! ```
//!
//! ## Rules
//! - A stopping poll rejects new signals; queued ones are still handed out.
//! - The poll turns stopping when its owner is deleted or its handler returns.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::WaitError;
use crate::signals::{SignalNode, SignalQueue};

struct PollState {
    queue: SignalQueue,
    stopping: bool,
}

/// Private queue + thread of a poll slot.
pub(crate) struct Poll {
    state: Mutex<PollState>,
    event: Condvar,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Poll {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(PollState {
                queue: SignalQueue::new(),
                stopping: false,
            }),
            event: Condvar::new(),
            thread: Mutex::new(None),
        }
    }

    /// Appends a node and wakes the waiter; hands the node back if stopping.
    pub(crate) fn push(&self, node: Box<SignalNode>) -> Result<(), Box<SignalNode>> {
        let mut st = self.state.lock();
        if st.stopping {
            return Err(node);
        }
        st.queue.push_back(node);
        self.event.notify_one();
        Ok(())
    }

    /// Bounded-wait consumer; `None` blocks indefinitely.
    pub(crate) fn wait(&self, timeout: Option<Duration>) -> Result<Box<SignalNode>, WaitError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut st = self.state.lock();
        loop {
            if let Some(node) = st.queue.pop_front() {
                return Ok(node);
            }
            if st.stopping {
                return Err(WaitError::Closed);
            }
            match deadline {
                None => self.event.wait(&mut st),
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return Err(WaitError::Timeout);
                    }
                    self.event.wait_until(&mut st, deadline);
                }
            }
        }
    }

    /// Marks the poll stopping, wakes waiters and returns the undelivered nodes.
    pub(crate) fn stop(&self) -> Vec<Box<SignalNode>> {
        let mut st = self.state.lock();
        st.stopping = true;
        self.event.notify_all();
        st.queue.drain(..).collect()
    }

    /// Called by the poll thread once its handler returned.
    pub(crate) fn finish(&self) {
        let mut st = self.state.lock();
        st.stopping = true;
        self.event.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn is_stopping(&self) -> bool {
        self.state.lock().stopping
    }

    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub(crate) fn attach(&self, handle: JoinHandle<()>) {
        *self.thread.lock() = Some(handle);
    }

    /// Joins the poll thread unless called from that very thread.
    pub(crate) fn join(&self) {
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::warn!("poll thread terminated by panic");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn zero_timeout_returns_immediately() {
        let poll = Poll::new();
        let started = Instant::now();
        assert_eq!(
            poll.wait(Some(Duration::ZERO)).err(),
            Some(WaitError::Timeout)
        );
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn stopped_poll_reports_closed_after_draining() {
        let poll = Poll::new();
        assert!(poll.push(Box::default()).is_ok());
        poll.finish();
        assert!(poll.wait(Some(Duration::ZERO)).is_ok());
        assert_eq!(poll.wait(None).err(), Some(WaitError::Closed));
        assert!(poll.push(Box::default()).is_err());
    }

    #[test]
    fn stop_returns_undelivered_nodes() {
        let poll = Poll::new();
        assert!(poll.push(Box::default()).is_ok());
        assert!(poll.push(Box::default()).is_ok());
        assert_eq!(poll.stop().len(), 2);
        assert_eq!(poll.queued(), 0);
        assert!(poll.is_stopping());
    }

    #[test]
    fn push_wakes_blocked_waiter() {
        let poll = Arc::new(Poll::new());
        let waiter = {
            let poll = Arc::clone(&poll);
            thread::spawn(move || poll.wait(Some(Duration::from_secs(5))).is_ok())
        };
        thread::sleep(Duration::from_millis(20));
        assert!(poll.push(Box::default()).is_ok());
        assert!(waiter.join().unwrap());
    }
}
