//! # Live-service counter.
//!
//! Counts the services that keep the runtime alive: the root service plus every
//! service whose startup returned [`Startup::Live`](crate::Startup::Live). Weak
//! services and services that failed to start are never counted.
//!
//! ## Terminal threshold
//! ```text
//! release() ─► live == 0                                       ─► terminal
//!          └─► live == 1, root still counted, no root handler  ─► terminal
//! ```
//! The second rule lets a runtime whose root service never installed a handler
//! stop once every other live service is gone.
//!
//! Guarded by the global runtime lock; not synchronized on its own.

#[derive(Debug)]
pub(crate) struct LiveCount {
    live: usize,
}

impl LiveCount {
    /// Starts at one: the root service.
    pub(crate) fn new() -> Self {
        Self { live: 1 }
    }

    pub(crate) fn admit(&mut self) {
        self.live += 1;
    }

    /// Removes one counted service and reports whether the threshold was reached.
    ///
    /// `root_passive` is true while the root service is still counted and has no
    /// slot handler, i.e. it only waits for the others.
    pub(crate) fn release(&mut self, root_passive: bool) -> bool {
        self.live = self.live.saturating_sub(1);
        self.is_terminal(root_passive)
    }

    pub(crate) fn is_terminal(&self, root_passive: bool) -> bool {
        self.live == 0 || (self.live == 1 && root_passive)
    }

    pub(crate) fn get(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passive_root_stops_at_one() {
        let mut live = LiveCount::new();
        live.admit();
        assert!(live.release(true));
        assert_eq!(live.get(), 1);
    }

    #[test]
    fn active_root_keeps_runtime_alive() {
        let mut live = LiveCount::new();
        live.admit();
        assert!(!live.release(false));
        assert!(live.release(false));
        assert_eq!(live.get(), 0);
    }
}
