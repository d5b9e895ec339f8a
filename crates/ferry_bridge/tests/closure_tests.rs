//! Closure registry tests, run against the mock host. These live as
//! integration tests so that `ferry_bridge` and `ferry_testhost` share
//! a single build of the bridge (see the dev-dependency cycle note in
//! the crate manifests).

use ferry_bridge::{registry_stats, AnyValue, Closure, OneShotClosure};
use ferry_testhost::{HostValue, MockHost};

#[test]
fn func_refs_are_unique_and_monotonic() {
    let _host = MockHost::install();
    let mut a = Closure::new(|_| AnyValue::Undefined);
    let mut b = Closure::new(|_| AnyValue::Undefined);
    assert!(b.func_ref() > a.func_ref());
    a.release();
    b.release();
}

#[test]
fn release_is_idempotent_and_keeps_registry_consistent() {
    let _host = MockHost::install();
    let mut kept = Closure::new(|_| AnyValue::Undefined);
    let mut released = Closure::new(|_| AnyValue::Undefined);
    released.release();
    released.release();

    let stats = registry_stats();
    assert_eq!(stats.active, 1);
    assert_eq!(stats.reusable, 1);
    kept.release();
}

#[test]
#[should_panic(expected = "dropped without release")]
fn dropping_unreleased_reusable_is_fatal() {
    let _host = MockHost::install();
    let closure = Closure::new(|_| AnyValue::Undefined);
    drop(closure);
}

#[test]
fn dropping_one_shot_is_not_fatal() {
    let host = MockHost::install();
    let never_fired = OneShotClosure::new(|_| AnyValue::Undefined);
    drop(never_fired);

    // Cancelled before the host got to it.
    let mut cancelled = OneShotClosure::new(|_| AnyValue::Undefined);
    cancelled.release();
    assert_eq!(registry_stats().one_shot, 1);
    let _ = host;
}

#[test]
fn stats_track_kinds() {
    let _host = MockHost::install();
    let mut a = Closure::new(|_| AnyValue::Undefined);
    let _b = OneShotClosure::new(|_| AnyValue::Undefined);
    let stats = registry_stats();
    assert_eq!((stats.active, stats.reusable, stats.one_shot), (2, 1, 1));
    a.release();
}

#[test]
fn host_can_invoke_registered_closure() {
    let host = MockHost::install();
    let mut doubler = Closure::new(|args| AnyValue::Number(args[0].expect_number() * 2.0));
    host.set_global("double", HostValue::from_value(&doubler.as_value()));

    let result = ferry_bridge::object::global("double")
        .expect_function()
        .call(&[AnyValue::Number(21.0)]);
    assert_eq!(result, AnyValue::Number(42.0));
    doubler.release();
}
