//! # Service liveness tracker fed by monitor notices.
//!
//! A service started under the name `monitor` receives one notice per service
//! lifecycle edge:
//!
//! | kind | payload          | source              |
//! |------|------------------|---------------------|
//! | `0`  | started service  | the requiring service |
//! | `1`  | deleted service  | the root service    |
//!
//! [`MonitorTracker`] is a ready-made monitor that keeps the authoritative set of
//! alive service names.
//!
//! ## Architecture
//! ```text
//! require(name) ─ startup ok ─► emit(monitor, kind 0, name) ─┐
//! delete_service(svc) ─────────► emit(monitor, kind 1, name) ─┤
//!                                                              ▼
//!                                            MonitorTracker::update()
//!                                                              │
//!                                                              ▼
//!                                              HashMap<String, Record>
//!                                                   (name → {starts, alive})
//! ```
//!
//! ## Rules
//! - Notices for one monitor are delivered in emission order (one queue)
//! - Read operations (`snapshot`, `is_alive`) are **eventually consistent**
//! - Unknown kinds are ignored

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::Runtime;
use crate::error::HandlerError;
use crate::services::handler::{ServiceHandler, Startup};
use crate::signals::Signal;

/// Kind of the notice sent when a service finished its startup.
pub const MONITOR_STARTED: u8 = 0;

/// Kind of the notice sent when a service was deleted.
pub const MONITOR_DELETED: u8 = 1;

/// Per-service record.
#[derive(Debug, Clone, Default)]
struct Record {
    /// How many times a service with this name started.
    starts: u64,
    /// Current status (true = alive, false = deleted).
    alive: bool,
}

/// Thread-safe tracker of alive services.
///
/// Cloning is cheap; clones share the same table, so one clone can be handed to
/// `require_with("monitor", ...)` while another is kept for queries.
#[derive(Clone, Default)]
pub struct MonitorTracker {
    state: Arc<RwLock<HashMap<String, Record>>>,
}

impl MonitorTracker {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one monitor notice; returns `true` if the alive state changed.
    ///
    /// ### State transitions
    /// - kind `0` → alive=true, starts += 1
    /// - kind `1` → alive=false
    /// - other kinds → ignored
    pub fn update(&self, signal: &Signal) -> bool {
        let Some(name) = signal.as_str() else {
            return false;
        };
        let mut state = self.state.write();
        match signal.kind() {
            MONITOR_STARTED => {
                let entry = state.entry(name.to_string()).or_default();
                entry.starts += 1;
                let changed = !entry.alive;
                entry.alive = true;
                changed
            }
            MONITOR_DELETED => match state.get_mut(name) {
                Some(entry) if entry.alive => {
                    entry.alive = false;
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// Returns sorted list of currently alive service names.
    pub fn snapshot(&self) -> Vec<String> {
        let state = self.state.read();
        let mut alive: Vec<String> = state
            .iter()
            .filter(|(_, s)| s.alive)
            .map(|(name, _)| name.clone())
            .collect();
        alive.sort_unstable();
        alive
    }

    /// Returns true if the service is currently alive.
    pub fn is_alive(&self, name: &str) -> bool {
        self.state.read().get(name).is_some_and(|s| s.alive)
    }

    /// Number of times a service with this name started.
    pub fn starts(&self, name: &str) -> u64 {
        self.state.read().get(name).map_or(0, |s| s.starts)
    }
}

impl ServiceHandler for MonitorTracker {
    fn start(&self, rt: &Runtime) -> Result<Startup, HandlerError> {
        let tracker = self.clone();
        rt.current().slot().set_handler(move |_rt, _slot, signal| {
            if let Some(signal) = signal {
                if tracker.update(signal) {
                    tracing::debug!(kind = signal.kind(), service = ?signal.as_str(), "monitor notice");
                }
            }
            Ok(())
        });
        Ok(Startup::Weak)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RuntimeConfig;

    fn notice(rt: &Runtime, kind: u8, name: &str) -> Signal {
        let mut payload = name.as_bytes().to_vec();
        payload.push(0);
        Signal {
            source: rt.root().clone(),
            kind,
            session: 0,
            payload: Some(payload),
            terminated: true,
        }
    }

    #[test]
    fn notices_flip_alive_state() {
        let rt = Runtime::new(RuntimeConfig::default());
        let tracker = MonitorTracker::new();

        assert!(tracker.update(&notice(&rt, MONITOR_STARTED, "echo")));
        assert!(!tracker.update(&notice(&rt, MONITOR_STARTED, "echo")));
        assert_eq!(tracker.starts("echo"), 2);
        assert!(tracker.update(&notice(&rt, MONITOR_STARTED, "db")));
        assert_eq!(tracker.snapshot(), vec!["db", "echo"]);

        assert!(tracker.update(&notice(&rt, MONITOR_DELETED, "echo")));
        assert!(!tracker.update(&notice(&rt, MONITOR_DELETED, "echo")));
        assert!(!tracker.update(&notice(&rt, MONITOR_DELETED, "ghost")));
        assert!(!tracker.update(&notice(&rt, 9, "db")));
        assert_eq!(tracker.snapshot(), vec!["db"]);
        assert!(!tracker.is_alive("echo"));
    }

    #[test]
    fn started_tracker_is_weak_and_handles_its_slot() {
        let rt = Runtime::new(RuntimeConfig::default());
        let svc = rt
            .require_with("monitor", Arc::new(MonitorTracker::new()))
            .unwrap();
        assert!(svc.is_weak());
        assert!(svc.slot().handler().is_some());
    }
}
