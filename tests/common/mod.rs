#![allow(dead_code)]

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use slotvisor::{Runtime, RuntimeConfig};

/// Upper bound for anything a test waits on.
pub const PATIENCE: Duration = Duration::from_secs(5);

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

pub fn runtime(threads: usize) -> Runtime {
    init_tracing();
    Runtime::new(RuntimeConfig {
        threads,
        ..RuntimeConfig::default()
    })
}

/// Channel whose sender can be captured by `Fn + Send + Sync` handlers.
pub fn channel<T>() -> (Arc<Mutex<Sender<T>>>, Receiver<T>) {
    let (tx, rx) = mpsc::channel();
    (Arc::new(Mutex::new(tx)), rx)
}

pub fn send<T>(tx: &Mutex<Sender<T>>, value: T) {
    let _ = tx.lock().unwrap().send(value);
}

/// Polls `cond` until it holds or [`PATIENCE`] runs out.
pub fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + PATIENCE;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// Closes the root service and tears the runtime down.
pub fn shutdown(rt: &Runtime) {
    rt.close_service(rt.root());
    rt.wait_close();
    rt.close();
}
