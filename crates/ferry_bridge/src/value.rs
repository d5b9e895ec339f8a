//! Guest-side view of host values
//!
//! `AnyValue` is the closed sum standing in for the host's dynamic
//! values. Consumption sites match exhaustively; the function-ness of a
//! reference is resolved at decode time by probing the host, which is
//! the source of truth for that distinction.

use crate::boundary::{boundary, try_boundary};
use crate::error::BridgeError;
use crate::object::HostRef;
use ferry_abi::{Handle, WireKind, WireSlot};

/// A host value observed by the guest.
///
/// Equality is structural for `Boolean`/`Number`/`Null`/`Undefined`,
/// content-based for `String`, and handle-identity-based for
/// `Object`/`Function`.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyValue {
    Boolean(bool),
    String(String),
    Number(f64),
    Object(HostRef),
    Function(HostRef),
    Null,
    Undefined,
}

impl AnyValue {
    /// Decode a boundary slot, acquiring ownership of any handle it
    /// carries.
    ///
    /// String bytes are copied into guest storage here and nowhere
    /// else; the transferred string handle is released after the copy.
    /// A reference slot tagged `Object` is probed against the host's
    /// function predicate and upgraded to `Function` when it passes.
    pub fn decode(slot: WireSlot) -> AnyValue {
        match slot.kind() {
            WireKind::Boolean => AnyValue::Boolean(slot.payload1 != 0),
            WireKind::Number => AnyValue::Number(slot.number_value()),
            WireKind::String => {
                let b = boundary();
                let copy = b.read_string(slot.payload1, slot.payload2);
                b.release(slot.payload1);
                AnyValue::String(copy)
            }
            WireKind::Object => {
                let reference = HostRef::from_owned(slot.payload1);
                if boundary().is_function(reference.handle()) {
                    AnyValue::Function(reference)
                } else {
                    AnyValue::Object(reference)
                }
            }
            WireKind::Function => AnyValue::Function(HostRef::from_owned(slot.payload1)),
            WireKind::Null => AnyValue::Null,
            WireKind::Undefined => AnyValue::Undefined,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AnyValue::Boolean(_) => "boolean",
            AnyValue::String(_) => "string",
            AnyValue::Number(_) => "number",
            AnyValue::Object(_) => "object",
            AnyValue::Function(_) => "function",
            AnyValue::Null => "null",
            AnyValue::Undefined => "undefined",
        }
    }

    /// Host-side dynamic type check. Primitive variants are never
    /// instances of anything, so this returns `false` for them rather
    /// than failing.
    pub fn is_instance_of(&self, ctor: &HostRef) -> bool {
        match self {
            AnyValue::Object(r) | AnyValue::Function(r) => r.instance_of(ctor),
            _ => false,
        }
    }

    pub fn try_boolean(&self) -> Result<bool, BridgeError> {
        match self {
            AnyValue::Boolean(b) => Ok(*b),
            other => Err(mismatch("boolean", other)),
        }
    }

    pub fn try_number(&self) -> Result<f64, BridgeError> {
        match self {
            AnyValue::Number(n) => Ok(*n),
            other => Err(mismatch("number", other)),
        }
    }

    pub fn try_string(&self) -> Result<&str, BridgeError> {
        match self {
            AnyValue::String(s) => Ok(s),
            other => Err(mismatch("string", other)),
        }
    }

    pub fn try_object(&self) -> Result<&HostRef, BridgeError> {
        match self {
            AnyValue::Object(r) => Ok(r),
            other => Err(mismatch("object", other)),
        }
    }

    pub fn try_function(&self) -> Result<&HostRef, BridgeError> {
        match self {
            AnyValue::Function(r) => Ok(r),
            other => Err(mismatch("function", other)),
        }
    }

    /// Shape-checked accessors for call sites where the boundary
    /// contract guarantees the variant. A mismatch here means the two
    /// runtimes disagree about an established contract, so it is fatal
    /// at the caller's location rather than substituted with a default.
    #[track_caller]
    pub fn expect_number(&self) -> f64 {
        self.try_number().unwrap_or_else(|e| panic!("{e}"))
    }

    #[track_caller]
    pub fn expect_string(&self) -> &str {
        self.try_string().unwrap_or_else(|e| panic!("{e}"))
    }

    #[track_caller]
    pub fn expect_object(&self) -> &HostRef {
        self.try_object().unwrap_or_else(|e| panic!("{e}"))
    }

    #[track_caller]
    pub fn expect_function(&self) -> &HostRef {
        self.try_function().unwrap_or_else(|e| panic!("{e}"))
    }
}

fn mismatch(expected: &'static str, found: &AnyValue) -> BridgeError {
    BridgeError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

impl From<bool> for AnyValue {
    fn from(v: bool) -> Self {
        AnyValue::Boolean(v)
    }
}

impl From<f64> for AnyValue {
    fn from(v: f64) -> Self {
        AnyValue::Number(v)
    }
}

impl From<&str> for AnyValue {
    fn from(v: &str) -> Self {
        AnyValue::String(v.to_string())
    }
}

/// Encode-side counterpart of [`AnyValue::decode`].
///
/// Encoding borrows handles rather than transferring them, but guest
/// strings must be copied into fresh host storage first. The writer owns
/// those temporary string handles and releases them when dropped, so a
/// writer must outlive the boundary call consuming its slots.
pub struct SlotWriter {
    temps: Vec<Handle>,
}

impl SlotWriter {
    pub fn new() -> Self {
        Self { temps: Vec::new() }
    }

    pub fn slot(&mut self, value: &AnyValue) -> WireSlot {
        match value {
            AnyValue::Boolean(b) => WireSlot::boolean(*b),
            AnyValue::Number(n) => WireSlot::number(*n),
            AnyValue::String(s) => {
                let handle = boundary().alloc_string(s);
                self.temps.push(handle);
                WireSlot::string(handle, s.len() as u32)
            }
            AnyValue::Object(r) => WireSlot::object(r.handle()),
            AnyValue::Function(r) => WireSlot::function(r.handle()),
            AnyValue::Null => WireSlot::null(),
            AnyValue::Undefined => WireSlot::undefined(),
        }
    }

    pub fn slots(&mut self, values: &[AnyValue]) -> Vec<WireSlot> {
        values.iter().map(|v| self.slot(v)).collect()
    }
}

impl Default for SlotWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SlotWriter {
    fn drop(&mut self) {
        if self.temps.is_empty() {
            return;
        }
        if let Some(b) = try_boundary() {
            for handle in self.temps.drain(..) {
                b.release(handle);
            }
        }
    }
}
