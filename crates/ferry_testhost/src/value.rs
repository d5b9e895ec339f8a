//! Host-side dynamic values

use ferry_abi::Handle;
use ferry_bridge::AnyValue;

/// A value as the mock host stores it. Reference values point at a heap
/// slot, so identity is the slot index.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Ref(Handle),
}

impl HostValue {
    /// Host-side view of a guest value, for seeding globals in tests.
    /// Reference variants alias the guest wrapper's handle.
    pub fn from_value(value: &AnyValue) -> HostValue {
        match value {
            AnyValue::Boolean(b) => HostValue::Bool(*b),
            AnyValue::Number(n) => HostValue::Num(*n),
            AnyValue::String(s) => HostValue::Str(s.clone()),
            AnyValue::Object(r) | AnyValue::Function(r) => HostValue::Ref(r.handle()),
            AnyValue::Null => HostValue::Null,
            AnyValue::Undefined => HostValue::Undefined,
        }
    }
}
