mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use common::{eventually, runtime};
use slotvisor::{
    MonitorTracker, Runtime, RuntimeConfig, RuntimeError, SearchPathResolver, ServiceFn,
    ServiceHandler, Startup, StaticLoader,
};

fn counting(starts: &Arc<AtomicUsize>, startup: Startup) -> Arc<dyn ServiceHandler> {
    let starts = Arc::clone(starts);
    ServiceFn::arc(move |_rt: &Runtime| {
        starts.fetch_add(1, Ordering::SeqCst);
        Ok(startup)
    })
}

#[test]
fn monitor_tracks_started_and_deleted_services() {
    let rt = runtime(1);
    let tracker = MonitorTracker::new();
    rt.require_with("monitor", Arc::new(tracker.clone())).unwrap();
    rt.require_with("a", ServiceFn::arc(|_rt: &Runtime| Ok(Startup::Live)))
        .unwrap();
    rt.require_with("b", ServiceFn::arc(|_rt: &Runtime| Ok(Startup::Weak)))
        .unwrap();
    rt.start().unwrap();

    assert!(eventually(|| tracker.snapshot() == ["a", "b"]));
    assert!(!tracker.is_alive("monitor"));

    rt.close_service(&rt.service("b").unwrap());
    assert!(eventually(|| !tracker.is_alive("b")));
    assert!(tracker.is_alive("a"));

    // a is the last live service
    rt.close_service(&rt.service("a").unwrap());
    rt.wait_close();
    assert!(!tracker.is_alive("a"));
    assert_eq!(tracker.starts("a"), 1);
    assert!(tracker.snapshot().is_empty());
    rt.close();
}

#[test]
fn preload_is_consumed_by_the_first_require() {
    let rt = runtime(1);
    let starts = Arc::new(AtomicUsize::new(0));

    assert_eq!(rt.preload("cache", counting(&starts, Startup::Weak)), Ok(true));
    assert_eq!(rt.preload("cache", counting(&starts, Startup::Weak)), Ok(false));
    assert_eq!(rt.preload("root", counting(&starts, Startup::Weak)), Ok(false));
    assert_eq!(
        rt.preload("bad name", counting(&starts, Startup::Weak))
            .unwrap_err()
            .as_label(),
        "runtime_invalid_name"
    );

    let first = rt.require("cache").unwrap();
    let again = rt.require("cache").unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(starts.load(Ordering::SeqCst), 1);
    assert!(first.is_weak());
}

#[test]
fn resolver_walks_the_search_path() {
    common::init_tracing();
    let starts = Arc::new(AtomicUsize::new(0));
    let loader = StaticLoader::new();
    loader.export("plugins/net.echo.so", "net.echo", counting(&starts, Startup::Live));
    loader.export("elsewhere/stray.so", "stray", counting(&starts, Startup::Live));

    let rt = Runtime::builder(RuntimeConfig::default())
        .with_threads(1)
        .with_search_path("plugins/?.so")
        .with_resolver(Arc::new(SearchPathResolver::new(loader)))
        .build();

    let echo = rt.require("net.echo").unwrap();
    assert_eq!(echo.name(), "net.echo");
    assert_eq!(rt.live_services(), 2);
    assert_eq!(
        rt.require("stray").unwrap_err(),
        RuntimeError::ServiceNotFound {
            name: "stray".into()
        }
    );
    assert_eq!(starts.load(Ordering::SeqCst), 1);
}

#[test]
fn explicit_handler_wins_over_resolution() {
    let rt = runtime(1);
    let starts = Arc::new(AtomicUsize::new(0));
    rt.preload("svc", counting(&starts, Startup::Live)).unwrap();

    let explicit = Arc::new(AtomicUsize::new(0));
    rt.require_with("svc", counting(&explicit, Startup::Weak))
        .unwrap();
    assert_eq!(explicit.load(Ordering::SeqCst), 1);
    assert_eq!(starts.load(Ordering::SeqCst), 0);
    assert_eq!(rt.live_services(), 1);
}

#[tokio::test]
async fn shutdown_token_resolves_when_the_runtime_stops() {
    let rt = runtime(1);
    rt.require_with("job", ServiceFn::arc(|_rt: &Runtime| Ok(Startup::Live)))
        .unwrap();
    rt.start().unwrap();
    let token = rt.shutdown_token();
    assert!(!token.is_cancelled());

    let closer = {
        let rt = rt.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            rt.close_service(&rt.service("job").unwrap());
        })
    };
    tokio::time::timeout(Duration::from_secs(5), token.cancelled())
        .await
        .expect("runtime did not stop");
    closer.join().unwrap();

    rt.wait_close();
    rt.close();
    assert!(rt.is_stopping());
}
