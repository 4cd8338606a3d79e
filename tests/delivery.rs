mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use common::{PATIENCE, channel, runtime, send};
use slotvisor::{HandlerError, Message, Runtime, ServiceFn, Signal, SlotRef, Startup};

#[test]
fn echo_answers_on_the_callers_pong_slot() {
    let rt = runtime(2);

    rt.require_with(
        "echo",
        ServiceFn::arc(|rt: &Runtime| {
            rt.current().slot().set_handler(|rt, _slot, sig| {
                if let Some(sig) = sig {
                    let reply = format!("{}.pong", sig.source().name());
                    rt.emit_data(&reply, sig.kind(), sig.session(), sig.data().unwrap_or_default())?;
                }
                Ok(())
            });
            Ok(Startup::Live)
        }),
    )
    .unwrap();

    let (tx, rx) = channel();
    rt.new_poll("pong", move |rt, slot, _| {
        while let Ok(sig) = rt.wait(slot, None) {
            send(&tx, (sig.source().name().to_string(), sig.session(), sig.as_str().map(str::to_owned)));
        }
        Ok(())
    })
    .unwrap();

    assert_eq!(rt.start(), Ok(2));
    for session in 1..=3 {
        rt.emit_str("echo", 1, session, &format!("ping {session}")).unwrap();
    }
    for session in 1..=3 {
        let (source, got_session, body) = rx.recv_timeout(PATIENCE).unwrap();
        assert_eq!(source, "echo");
        assert_eq!(got_session, session);
        assert_eq!(body, Some(format!("ping {session}")));
    }

    let echo = rt.service("echo").unwrap();
    rt.close_service(&echo);
    rt.wait_close();
    assert!(rt.is_stopping());
    assert!(rt.service("echo").is_none());
    rt.close();
    assert!(rt.slot("root.pong").is_none());
}

#[test]
fn signals_from_one_emitter_arrive_in_order() {
    let rt = runtime(4);
    let (tx, rx) = channel();
    rt.new_slot("inbox", move |_rt, _slot, sig| {
        if let Some(sig) = sig {
            send(&tx, sig.as_str().unwrap_or_default().to_string());
        }
        Ok(())
    })
    .unwrap();
    rt.start().unwrap();

    const SENDERS: usize = 4;
    const PER_SENDER: usize = 50;
    let producers: Vec<_> = (0..SENDERS)
        .map(|t| {
            let rt = rt.clone();
            thread::spawn(move || {
                for i in 0..PER_SENDER {
                    rt.emit_str("root.inbox", 1, 0, &format!("{t}:{i}")).unwrap();
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }

    let mut next = [0usize; SENDERS];
    for _ in 0..SENDERS * PER_SENDER {
        let line = rx.recv_timeout(PATIENCE).unwrap();
        let (t, i) = line.split_once(':').unwrap();
        let (t, i): (usize, usize) = (t.parse().unwrap(), i.parse().unwrap());
        assert_eq!(i, next[t], "sender {t} delivered out of order");
        next[t] += 1;
    }
    assert!(common::eventually(|| rt.root().pending() == 0));

    common::shutdown(&rt);
}

#[test]
fn a_service_never_runs_two_handlers_at_once() {
    let rt = runtime(4);
    let inside = Arc::new(AtomicBool::new(false));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = channel();

    {
        let inside = Arc::clone(&inside);
        let overlaps = Arc::clone(&overlaps);
        rt.require_with(
            "counter",
            ServiceFn::arc(move |rt: &Runtime| {
                let inside = Arc::clone(&inside);
                let overlaps = Arc::clone(&overlaps);
                let tx = Arc::clone(&tx);
                let handler = move |_rt: &Runtime,
                                    _slot: &SlotRef,
                                    sig: Option<&Signal>|
                      -> Result<(), HandlerError> {
                    if sig.is_none() {
                        return Ok(());
                    }
                    if inside.swap(true, Ordering::SeqCst) {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    thread::sleep(Duration::from_micros(200));
                    inside.store(false, Ordering::SeqCst);
                    send(&tx, ());
                    Ok(())
                };
                rt.current().slot().set_handler(handler.clone());
                rt.new_slot("side", handler)?;
                Ok(Startup::Live)
            }),
        )
        .unwrap();
    }
    rt.start().unwrap();

    let producers: Vec<_> = (0..4)
        .map(|t| {
            let rt = rt.clone();
            thread::spawn(move || {
                let target = if t % 2 == 0 { "counter" } else { "counter.side" };
                for _ in 0..25 {
                    rt.emit(target, Message::new(2)).unwrap();
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }
    for _ in 0..100 {
        rx.recv_timeout(PATIENCE).unwrap();
    }
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);

    rt.close_service(&rt.service("counter").unwrap());
    rt.wait_close();
    rt.close();
}

#[test]
fn copied_payloads_survive_buffer_reuse() {
    let rt = runtime(1);
    let (tx, rx) = channel();
    rt.new_slot("bytes", move |_rt, _slot, sig| {
        if let Some(sig) = sig {
            send(
                &tx,
                (
                    sig.data().map(<[u8]>::to_vec),
                    sig.bytes_with_nul().map(<[u8]>::to_vec),
                    sig.is_copied(),
                ),
            );
        }
        Ok(())
    })
    .unwrap();

    let mut buf = b"a\0b".to_vec();
    rt.emit_data("root.bytes", 3, 0, &buf).unwrap();
    buf.fill(b'x');
    rt.emit("root.bytes", Message::new(3).with_owned(vec![1, 2, 3]))
        .unwrap();
    rt.emit("root.bytes", Message::new(3)).unwrap();
    rt.start().unwrap();

    let (data, with_nul, copied) = rx.recv_timeout(PATIENCE).unwrap();
    assert_eq!(data.as_deref(), Some(&b"a\0b"[..]));
    assert_eq!(with_nul.as_deref(), Some(&b"a\0b\0"[..]));
    assert!(copied);

    let (data, with_nul, copied) = rx.recv_timeout(PATIENCE).unwrap();
    assert_eq!(data, Some(vec![1, 2, 3]));
    assert_eq!(with_nul, None);
    assert!(!copied);

    let (data, with_nul, copied) = rx.recv_timeout(PATIENCE).unwrap();
    assert_eq!(data, None);
    assert_eq!(with_nul, None);
    assert!(!copied);

    common::shutdown(&rt);
}
