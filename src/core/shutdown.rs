//! # Runtime-wide shutdown notification.
//!
//! The runtime flips to *Stopping* exactly once, when the live-service count hits
//! its terminal threshold. [`Shutdown`] mirrors that edge onto a
//! [`CancellationToken`] so async code can await it:
//!
//! ```text
//! delete_service ─► live count terminal ─► Shared.stopping = true
//!                                       ├─► wake.notify_all()    (workers exit)
//!                                       └─► Shutdown::trigger()  (token cancelled)
//! ```

use tokio_util::sync::CancellationToken;

/// Shutdown edge of one runtime.
#[derive(Debug, Default)]
pub(crate) struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Cancels the token; idempotent.
    pub(crate) fn trigger(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!("runtime stopping");
        }
        self.token.cancel();
    }

    /// Returns a clone of the token; awaiting `cancelled()` completes on shutdown.
    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_cancels_every_clone() {
        let shutdown = Shutdown::new();
        let token = shutdown.token();
        assert!(!token.is_cancelled());
        shutdown.trigger();
        shutdown.trigger();
        assert!(token.is_cancelled());
        assert!(shutdown.token().is_cancelled());
    }
}
