//! End-to-end scenarios across the codec, reference table, closure
//! registry and deferred bridge, driven by the mock host.

use ferry_abi::WireSlot;
use ferry_bridge::{global, AnyValue, Closure, Deferred, OneShotClosure};
use ferry_testhost::{HostValue, MockHost};
use std::cell::RefCell;
use std::rc::Rc;

/// Host invokes a registered closure through the raw trampoline entry;
/// the result arrives at the host-provided callback.
#[test]
fn trampoline_delivers_result_through_callback() {
    let host = MockHost::install();
    let mut echo = Closure::new(|args| args.first().cloned().unwrap_or(AnyValue::Undefined));

    let delivered = Rc::new(RefCell::new(None));
    let sink = delivered.clone();
    let callback = host.make_native(move |_, args| {
        *sink.borrow_mut() = Some(args.first().cloned().unwrap());
        HostValue::Undefined
    });
    let HostValue::Ref(callback) = callback else {
        unreachable!()
    };

    ferry_bridge::call_host_function(echo.func_ref(), &[WireSlot::number(42.0)], callback);

    assert_eq!(*delivered.borrow(), Some(HostValue::Num(42.0)));
    echo.release();
}

/// A delivery callback may answer with a reference value; the
/// trampoline owns that returned slot and must release its handle.
#[test]
fn trampoline_releases_delivery_result() {
    let host = MockHost::install();
    let mut echo = Closure::new(|args| args.first().cloned().unwrap_or(AnyValue::Undefined));

    let receipt = host.make_object(&[]);
    let callback = host.make_native(move |_, _| receipt.clone());
    let HostValue::Ref(callback) = callback else {
        unreachable!()
    };

    let before = host.live_handles();
    ferry_bridge::call_host_function(echo.func_ref(), &[WireSlot::number(1.0)], callback);
    assert_eq!(host.live_handles(), before);
    echo.release();
}

/// Same path exercised through the facade: calling the exported thunk
/// from the guest side round-trips host -> trampoline -> callback.
#[test]
fn thunk_call_round_trips_arguments() {
    let _host = MockHost::install();
    let mut concat = Closure::new(|args| {
        let mut joined = String::new();
        for arg in args {
            joined.push_str(arg.expect_string());
        }
        AnyValue::String(joined)
    });

    let result = concat
        .thunk()
        .call(&[AnyValue::from("fer"), AnyValue::from("ry")]);
    assert_eq!(result, AnyValue::String("ferry".into()));
    concat.release();
}

#[test]
#[should_panic(expected = "invoked after release")]
fn one_shot_second_invocation_is_fatal() {
    let _host = MockHost::install();
    let one_shot = OneShotClosure::new(|_| AnyValue::Undefined);
    let thunk = one_shot.thunk().clone();
    thunk.call(&[]);
    thunk.call(&[]);
}

#[test]
#[should_panic(expected = "invoked after release")]
fn invocation_after_release_is_fatal() {
    let _host = MockHost::install();
    let mut closure = Closure::new(|_| AnyValue::Undefined);
    let thunk = closure.thunk().clone();
    closure.release();
    thunk.call(&[]);
}

/// Double release keeps the registry intact (Scenario D): the surviving
/// registration is untouched and the released key still faults.
#[test]
fn double_release_preserves_other_registrations() {
    let _host = MockHost::install();
    let mut survivor = Closure::new(|_| AnyValue::from("alive"));
    let mut released = Closure::new(|_| AnyValue::Undefined);

    released.release();
    released.release();

    assert_eq!(ferry_bridge::registry_stats().active, 1);
    assert_eq!(survivor.thunk().call(&[]), AnyValue::String("alive".into()));
    survivor.release();
}

/// Scenario B: two-closure resolver pattern, fulfillment delivered to
/// the attached continuation exactly once.
#[test]
fn resolver_pattern_delivers_fulfillment_once() {
    let _host = MockHost::install();
    let resolvers = Rc::new(RefCell::new(None));
    let slot = resolvers.clone();
    let mut deferred = Deferred::with_rejector(move |fulfill, reject| {
        *slot.borrow_mut() = Some((fulfill, reject));
    });

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let _chained = deferred.then(move |value| {
        sink.borrow_mut().push(value);
        AnyValue::Undefined
    });

    let (fulfill, _) = resolvers.borrow().clone().unwrap();
    fulfill.expect_function().call(&[AnyValue::from("ok")]);

    assert_eq!(*seen.borrow(), vec![AnyValue::String("ok".into())]);
}

/// A continuation stays invocable while its owning wrapper lives, even
/// though the caller kept no handle to the closure itself.
#[test]
fn continuations_are_retained_until_wrapper_teardown() {
    let _host = MockHost::install();
    let resolvers = Rc::new(RefCell::new(None));
    let slot = resolvers.clone();
    let mut deferred = Deferred::with_rejector(move |fulfill, _| {
        *slot.borrow_mut() = Some(fulfill);
    });

    let fired = Rc::new(RefCell::new(false));
    let flag = fired.clone();
    let _chained = deferred.then(move |value| {
        *flag.borrow_mut() = true;
        value
    });

    // Time passes; the only reference to the continuation closure is
    // the wrapper's attached list.
    let fulfill = resolvers.borrow().clone().unwrap();
    fulfill.expect_function().call(&[AnyValue::Null]);
    assert!(*fired.borrow());
}

/// Promise wrappers are recognized by the host's dynamic type check.
#[test]
fn deferred_objects_are_promise_instances() {
    let _host = MockHost::install();
    let mut deferred = Deferred::new(|_| {});
    let ctor = global("Promise").expect_function().clone();

    assert!(deferred.object().instance_of(&ctor));
    let chained = deferred.then(|v| v);
    assert!(chained.object().instance_of(&ctor));
    assert!(!ctor.instance_of(&ctor));
}

/// Everything the guest acquired is released again once the wrappers
/// are gone: no leaked handle ownership on the host side.
#[test]
fn full_workflow_releases_every_handle() {
    let host = MockHost::install();
    host.set_global(
        "config",
        host.make_object(&[("answer", HostValue::Num(42.0))]),
    );
    assert_eq!(host.live_handles(), 0);

    {
        let config = global("config").expect_object().clone();
        assert_eq!(config.get("answer"), AnyValue::Number(42.0));
        config.set("note", &AnyValue::from("checked"));

        let mut echo = Closure::new(|args| args.first().cloned().unwrap_or(AnyValue::Undefined));
        assert_eq!(
            echo.thunk().call(&[AnyValue::from("ping")]),
            AnyValue::String("ping".into())
        );
        echo.release();

        let resolvers = Rc::new(RefCell::new(None));
        let slot = resolvers.clone();
        let mut deferred = Deferred::with_rejector(move |fulfill, _| {
            *slot.borrow_mut() = Some(fulfill);
        });
        let _chained = deferred.then(|v| v);
        let fulfill = resolvers.borrow().clone().unwrap();
        fulfill.expect_function().call(&[AnyValue::Number(1.0)]);
        resolvers.borrow_mut().take();
    }

    assert_eq!(host.live_handles(), 0);
    assert_eq!(ferry_bridge::registry_stats().active, 0);
}
