mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use common::{PATIENCE, channel, runtime, send};
use slotvisor::{HandlerError, HookFn, Interception, Message, Runtime, ServiceFn, Startup};

#[test]
fn failing_handler_unwinds_cleanups_and_keeps_the_service() {
    let rt = runtime(1);
    let order = Arc::new(Mutex::new(Vec::new()));
    let (tx, rx) = channel();

    {
        let order = Arc::clone(&order);
        rt.require_with(
            "fragile",
            ServiceFn::arc(move |rt: &Runtime| {
                let order = Arc::clone(&order);
                let tx = Arc::clone(&tx);
                rt.current().slot().set_handler(move |rt, _slot, sig| {
                    let Some(sig) = sig else { return Ok(()) };
                    send(&tx, rt.current().name().to_string());
                    if sig.kind() == 1 {
                        for i in 0..3 {
                            let order = Arc::clone(&order);
                            rt.add_cleanup(move |_| order.lock().unwrap().push(i))?;
                        }
                        return Err(rt.discard());
                    }
                    Ok(())
                });
                Ok(Startup::Weak)
            }),
        )
        .unwrap();
    }
    rt.start().unwrap();

    rt.emit("fragile", Message::new(1)).unwrap();
    rt.emit("fragile", Message::new(2)).unwrap();
    assert_eq!(rx.recv_timeout(PATIENCE).unwrap(), "fragile");
    assert_eq!(rx.recv_timeout(PATIENCE).unwrap(), "fragile");
    assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);

    common::shutdown(&rt);
}

#[test]
fn nested_pcall_only_unwinds_its_own_frame() {
    let rt = runtime(1);
    let ran = Arc::new(Mutex::new(Vec::new()));

    let outer = {
        let ran = Arc::clone(&ran);
        rt.pcall(move |rt| {
            let r = Arc::clone(&ran);
            rt.add_cleanup(move |_| r.lock().unwrap().push("outer"))?;

            let inner: Result<(), HandlerError> = rt.pcall(|rt| {
                let r = Arc::clone(&ran);
                rt.add_cleanup(move |_| r.lock().unwrap().push("inner"))?;
                Err(HandlerError::fail("inner failed"))
            });
            assert_eq!(inner.unwrap_err().as_label(), "handler_failed");
            Ok(Arc::ptr_eq(&rt.current(), rt.root()))
        })
    };
    assert_eq!(outer, Ok(true));
    assert_eq!(*ran.lock().unwrap(), vec!["inner"]);
}

#[test]
fn hook_may_swallow_signals_of_its_service() {
    let rt = runtime(1);
    let seen = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = channel();
    rt.new_slot("inbox", move |_rt, _slot, sig| {
        if let Some(sig) = sig {
            send(&tx, sig.kind());
        }
        Ok(())
    })
    .unwrap();

    {
        let seen = Arc::clone(&seen);
        rt.require_with(
            "spy",
            ServiceFn::arc(move |rt: &Runtime| {
                let seen = Arc::clone(&seen);
                rt.current().set_hook(Some(HookFn::arc(move |_rt, slot, sig| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(slot.name(), "root.inbox");
                    Ok(if sig.kind() == 5 {
                        Interception::Handled
                    } else {
                        Interception::Pass
                    })
                })));
                rt.emit("root.inbox", Message::new(5))?;
                rt.emit("root.inbox", Message::new(1))?;
                Ok(Startup::Weak)
            }),
        )
        .unwrap();
    }
    assert!(rt.service("spy").unwrap().hook().is_some());

    // root signals are not hooked
    rt.emit("root.inbox", Message::new(5)).unwrap();
    rt.start().unwrap();

    let mut kinds: Vec<u8> = (0..2).map(|_| rx.recv_timeout(PATIENCE).unwrap()).collect();
    kinds.sort_unstable();
    assert_eq!(kinds, vec![1, 5]);
    assert!(common::eventually(|| seen.load(Ordering::SeqCst) == 2));

    common::shutdown(&rt);
}

#[test]
fn log_lines_go_to_the_log_service() {
    let rt = runtime(1);
    let (tx, rx) = channel();
    rt.log("dropped: no logger yet");

    rt.require_with(
        "log",
        ServiceFn::arc(move |rt: &Runtime| {
            let tx = Arc::clone(&tx);
            rt.current().slot().set_handler(move |_rt, _slot, sig| {
                if let Some(sig) = sig {
                    send(&tx, (sig.source().name().to_string(), sig.as_str().map(str::to_owned)));
                }
                Ok(())
            });
            Ok(Startup::Weak)
        }),
    )
    .unwrap();
    rt.start().unwrap();

    rt.log("hello");
    rt.log_fmt(format_args!("n={}", 3));
    assert_eq!(
        rx.recv_timeout(PATIENCE).unwrap(),
        ("root".to_string(), Some("hello".to_string()))
    );
    assert_eq!(
        rx.recv_timeout(PATIENCE).unwrap(),
        ("root".to_string(), Some("n=3".to_string()))
    );

    common::shutdown(&rt);
}

#[test]
fn services_carry_typed_data() {
    let rt = runtime(1);
    let svc = rt
        .require_with(
            "stateful",
            ServiceFn::arc(|rt: &Runtime| {
                rt.current().set_data(Arc::new(41u32));
                Ok(Startup::Weak)
            }),
        )
        .unwrap();
    assert_eq!(svc.data::<u32>().as_deref(), Some(&41));
    assert!(svc.data::<String>().is_none());
    assert_eq!(rt.current().name(), "root");
}
