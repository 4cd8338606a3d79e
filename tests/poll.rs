mod common;

use std::time::{Duration, Instant};

use common::{PATIENCE, channel, runtime, send};
use slotvisor::{Lifecycle, Runtime, RuntimeError, ServiceFn, SlotKind, Startup, WaitError};

#[test]
fn bounded_wait_times_out_then_delivers() {
    let rt = runtime(1);
    let (tx, rx) = channel();
    let timer = rt
        .new_poll("timer", move |rt, slot, _| {
            let started = Instant::now();
            let first = rt.wait_ms(slot, 50);
            send(&tx, (first.map(|s| s.session()), started.elapsed()));

            loop {
                let started = Instant::now();
                let next = rt.wait(slot, None);
                let closed = next.is_err();
                send(&tx, (next.map(|s| s.session()), started.elapsed()));
                if closed {
                    return Ok(());
                }
            }
        })
        .unwrap();
    assert_eq!(timer.kind(), SlotKind::Poll);
    assert_eq!(timer.name(), "root.timer");

    let (first, waited) = rx.recv_timeout(PATIENCE).unwrap();
    assert_eq!(first, Err(WaitError::Timeout));
    assert!(waited >= Duration::from_millis(50));

    timer.emit_str(4, 9, "tick").unwrap();
    let (second, _) = rx.recv_timeout(PATIENCE).unwrap();
    assert_eq!(second, Ok(9));
    assert!(common::eventually(|| rt.root().pending() == 0));

    rt.start().unwrap();
    common::shutdown(&rt);
    let (last, _) = rx.recv_timeout(PATIENCE).unwrap();
    assert_eq!(last, Err(WaitError::Closed));
}

#[test]
fn zero_timeout_polls_without_blocking() {
    let rt = runtime(1);
    let (tx, rx) = channel();
    rt.new_poll("probe", move |rt, slot, _| {
        let started = Instant::now();
        let empty = rt.wait_ms(slot, 0).map(|s| s.kind());
        let elapsed = started.elapsed();
        send(&tx, (empty, elapsed));
        Ok(())
    })
    .unwrap();

    let (empty, elapsed) = rx.recv_timeout(PATIENCE).unwrap();
    assert_eq!(empty, Err(WaitError::Timeout));
    assert!(elapsed < Duration::from_millis(50));
}

#[test]
fn finished_poll_rejects_new_signals() {
    let rt = runtime(1);
    let (tx, rx) = channel();
    let once = rt
        .new_poll("once", move |_rt, _slot, _| {
            send(&tx, ());
            Ok(())
        })
        .unwrap();
    rx.recv_timeout(PATIENCE).unwrap();

    let closed = common::eventually(|| matches!(rt.wait_ms(&once, 0), Err(WaitError::Closed)));
    assert!(closed);
    assert_eq!(
        once.emit_str(1, 0, "late"),
        Err(RuntimeError::TargetStopping {
            slot: "root.once".into()
        })
    );
    assert_eq!(rt.root().pending(), 0);
}

#[test]
fn poll_of_a_stopping_service_rejects_signals() {
    let rt = runtime(1);
    let owner = rt
        .require_with(
            "owner",
            ServiceFn::arc(|rt: &Runtime| {
                rt.new_poll("inbox", |rt, slot, _| {
                    while rt.wait(slot, None).is_ok() {}
                    Ok(())
                })?;
                Ok(Startup::Weak)
            }),
        )
        .unwrap();

    rt.emit_str("owner.inbox", 1, 0, "before close").unwrap();
    assert!(common::eventually(|| rt.root().pending() == 0));

    rt.close_service(&owner);
    assert_eq!(owner.lifecycle(), Lifecycle::Stopping);
    assert_eq!(
        rt.emit_str("owner.inbox", 1, 0, "after close"),
        Err(RuntimeError::TargetStopping {
            slot: "owner.inbox".into()
        })
    );
    assert_eq!(rt.root().pending(), 0);

    rt.start().unwrap();
    assert!(common::eventually(|| rt.service("owner").is_none()));
    common::shutdown(&rt);
}
