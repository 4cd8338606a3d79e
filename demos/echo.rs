//! # Example: echo
//!
//! Two services exchanging signals on a small worker pool, with the built-in
//! `log` and `monitor` services attached.
//!
//! Demonstrates how to:
//! - Start built-in services ([`LogWriter`], [`MonitorTracker`]) under their well-known names.
//! - Define a service with [`ServiceFn`] and answer signals on its primary slot.
//! - Consume replies synchronously on a poll slot.
//! - Stop the runtime by closing the last live service.
//!
//! ## Flow
//! ```text
//! main (root)
//!   ├─► require("log", LogWriter)       weak, becomes the logger
//!   ├─► require("monitor", tracker)     weak, receives start/delete notices
//!   ├─► require("echo")                 live
//!   ├─► new_poll("pong")                forwards replies to main
//!   ├─► emit("echo", ping #n) ──► echo handler ──► emit("root.pong", #n)
//!   └─► close_service(echo) ──► live count terminal ──► wait_close ──► close
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example echo --features logging
//! ```

use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use slotvisor::{LogWriter, MonitorTracker, Runtime, RuntimeConfig, ServiceFn, Startup};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // 1. Runtime with a small pool
    let rt = Runtime::new(RuntimeConfig {
        threads: 2,
        ..RuntimeConfig::default()
    });

    // 2. Built-in services
    rt.require_with("log", Arc::new(LogWriter::new()))?;
    let tracker = MonitorTracker::new();
    rt.require_with("monitor", Arc::new(tracker.clone()))?;

    // 3. Echo service: replies to `<source>.pong` with the same payload
    rt.require_with(
        "echo",
        ServiceFn::arc(|rt: &Runtime| {
            rt.current().slot().set_handler(|rt, _slot, sig| {
                let Some(sig) = sig else {
                    rt.log("echo: bye");
                    return Ok(());
                };
                rt.log_fmt(format_args!("echo: ping #{} from {}", sig.session(), sig.source().name()));
                let reply = format!("{}.pong", sig.source().name());
                rt.emit_data(&reply, sig.kind(), sig.session(), sig.data().unwrap_or_default())?;
                Ok(())
            });
            Ok(Startup::Live)
        }),
    )?;

    // 4. Poll on the root service, forwarding replies to main
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    rt.new_poll("pong", move |rt, slot, _| {
        while let Ok(sig) = rt.wait(slot, None) {
            let text = sig.as_str().unwrap_or("<binary>").to_string();
            let Ok(guard) = tx.lock() else { break };
            if guard.send((sig.session(), text)).is_err() {
                break;
            }
        }
        Ok(())
    })?;

    // 5. Run
    let workers = rt.start()?;
    rt.log_fmt(format_args!("root: {workers} workers up"));

    for session in 1..=5 {
        rt.emit_str("echo", 1, session, &format!("hello #{session}"))?;
    }
    for _ in 1..=5 {
        let (session, text) = rx.recv_timeout(Duration::from_secs(5))?;
        println!("[root] pong #{session}: {text}");
    }
    println!("[root] alive: {:?}", tracker.snapshot());

    // 6. Echo is the only live service besides root: closing it stops the runtime
    if let Some(echo) = rt.service("echo") {
        rt.close_service(&echo);
    }
    rt.wait_close();
    rt.close();
    println!("[root] stopped, alive: {:?}", tracker.snapshot());
    Ok(())
}
