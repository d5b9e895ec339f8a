//! Host reference and property access tests, run against the mock
//! host. These live as integration tests so that `ferry_bridge` and
//! `ferry_testhost` share a single build of the bridge (see the
//! dev-dependency cycle note in the crate manifests).

use ferry_bridge::{global, AnyValue};
use ferry_testhost::{HostValue, MockHost};

#[test]
fn property_round_trip() {
    let host = MockHost::install();
    host.set_global("config", host.make_object(&[("retries", HostValue::Num(3.0))]));

    let config = global("config").expect_object().clone();
    assert_eq!(config.get("retries"), AnyValue::Number(3.0));
    assert_eq!(config.get("missing"), AnyValue::Undefined);

    config.set("label", &AnyValue::from("primary"));
    assert_eq!(config.get("label"), AnyValue::String("primary".into()));
}

#[test]
fn index_round_trip() {
    let host = MockHost::install();
    host.set_global("row", host.make_object(&[]));

    let row = global("row").expect_object().clone();
    row.set_index(2, &AnyValue::Number(9.0));
    assert_eq!(row.get_index(2), AnyValue::Number(9.0));
    assert_eq!(row.get_index(0), AnyValue::Undefined);
    assert_eq!(row.get_index(100), AnyValue::Undefined);
}

#[test]
fn handles_are_stable_per_host_object() {
    let host = MockHost::install();
    host.set_global("shared", host.make_object(&[]));

    let a = global("shared").expect_object().clone();
    let b = global("shared").expect_object().clone();
    assert_eq!(a.handle(), b.handle());
}

#[test]
fn clones_release_once() {
    let host = MockHost::install();
    host.set_global("obj", host.make_object(&[]));

    let before = host.live_handles();
    {
        let a = global("obj").expect_object().clone();
        let b = a.clone();
        assert_eq!(a.handle(), b.handle());
    }
    assert_eq!(host.live_handles(), before);
}

#[test]
fn instance_of_is_false_for_primitives() {
    let host = MockHost::install();
    host.set_global("obj", host.make_object(&[]));
    let ctor = global("Promise").expect_function().clone();

    assert!(!AnyValue::Number(1.0).is_instance_of(&ctor));
    assert!(!AnyValue::Null.is_instance_of(&ctor));
    assert!(!AnyValue::String("x".into()).is_instance_of(&ctor));
    assert!(!global("obj").is_instance_of(&ctor));
}

#[test]
#[should_panic(expected = "expected member 'missing' to be a function")]
fn invoking_a_non_function_member_is_fatal() {
    let host = MockHost::install();
    host.set_global("obj", host.make_object(&[]));
    let obj = global("obj").expect_object().clone();
    obj.invoke("missing", &[]);
}
