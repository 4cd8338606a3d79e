//! # LogWriter: built-in logger service.
//!
//! A service started under the name `log` becomes the runtime logger:
//! [`Runtime::log`](crate::Runtime::log) emits every line to its primary slot as
//! a copied string signal. `LogWriter` is a ready-made implementation that
//! forwards those lines to `tracing` at `INFO` level.
//!
//! ## Example output (with a `fmt` subscriber)
//! ```text
//! INFO slotvisor::log: pong sent source="echo"
//! INFO slotvisor::log: all services up source="root"
//! ```

use crate::core::Runtime;
use crate::error::HandlerError;
use crate::services::handler::{ServiceHandler, Startup};
use crate::signals::Signal;
use crate::slots::SlotRef;

/// Logger service that prints received lines through `tracing`.
///
/// Starts as a weak service, so it never keeps the runtime alive on its own.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn write_line(_rt: &Runtime, _slot: &SlotRef, signal: Option<&Signal>) -> Result<(), HandlerError> {
    let Some(signal) = signal else {
        return Ok(());
    };
    let line = match signal.as_str() {
        Some(s) => s.to_string(),
        None => String::from_utf8_lossy(signal.data().unwrap_or_default()).into_owned(),
    };
    tracing::info!(
        target: "slotvisor::log",
        source = %signal.source().name(),
        "{}",
        line.trim_end_matches('\n')
    );
    Ok(())
}

impl ServiceHandler for LogWriter {
    fn start(&self, rt: &Runtime) -> Result<Startup, HandlerError> {
        rt.current().slot().set_handler(write_line);
        Ok(Startup::Weak)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::RuntimeConfig;

    #[test]
    fn log_writer_becomes_a_weak_logger() {
        let rt = Runtime::new(RuntimeConfig::default());
        let svc = rt.require_with("log", Arc::new(LogWriter::new())).unwrap();
        assert!(svc.is_weak());
        assert!(svc.slot().handler().is_some());

        rt.log("queued for the logger");
        assert_eq!(svc.queued(), 1);
        assert_eq!(rt.root().pending(), 1);
    }
}
