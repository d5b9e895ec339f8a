//! Tagged value slot crossing the boundary
//!
//! Every value travels as a fixed-width slot: a small discriminant plus
//! two 32-bit payload words. The boundary is trusted-by-construction, so
//! an out-of-range discriminant is a protocol violation and fatal.

/// Discriminant of a [`WireSlot`].
///
/// The numeric values are part of the wire protocol and must match the
/// host side.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum WireKind {
    Boolean = 0,
    String = 1,
    Number = 2,
    Object = 3,
    Null = 4,
    Undefined = 5,
    Function = 6,
}

/// Boundary-crossing value representation.
///
/// Payload layout per kind:
/// - `Boolean`: payload1 = 0 or 1
/// - `String`: payload1 = string handle, payload2 = byte length
/// - `Number`: payload1 = low 32 bits, payload2 = high 32 bits of the
///   IEEE-754 double bit pattern
/// - `Object` / `Function`: payload1 = object handle
/// - `Null` / `Undefined`: payloads unused (zero)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct WireSlot {
    pub kind: u32,
    pub payload1: u32,
    pub payload2: u32,
}

impl WireSlot {
    pub const fn boolean(value: bool) -> Self {
        Self {
            kind: WireKind::Boolean as u32,
            payload1: value as u32,
            payload2: 0,
        }
    }

    pub const fn string(handle: u32, byte_len: u32) -> Self {
        Self {
            kind: WireKind::String as u32,
            payload1: handle,
            payload2: byte_len,
        }
    }

    pub fn number(value: f64) -> Self {
        let bits = value.to_bits();
        Self {
            kind: WireKind::Number as u32,
            payload1: bits as u32,
            payload2: (bits >> 32) as u32,
        }
    }

    pub const fn object(handle: u32) -> Self {
        Self {
            kind: WireKind::Object as u32,
            payload1: handle,
            payload2: 0,
        }
    }

    pub const fn function(handle: u32) -> Self {
        Self {
            kind: WireKind::Function as u32,
            payload1: handle,
            payload2: 0,
        }
    }

    pub const fn null() -> Self {
        Self {
            kind: WireKind::Null as u32,
            payload1: 0,
            payload2: 0,
        }
    }

    pub const fn undefined() -> Self {
        Self {
            kind: WireKind::Undefined as u32,
            payload1: 0,
            payload2: 0,
        }
    }

    /// Decode the discriminant.
    ///
    /// Panics on an out-of-range discriminant: the boundary is trusted,
    /// so a bad tag means the two sides disagree on the protocol and
    /// continuing would corrupt state.
    pub fn kind(&self) -> WireKind {
        match self.kind {
            0 => WireKind::Boolean,
            1 => WireKind::String,
            2 => WireKind::Number,
            3 => WireKind::Object,
            4 => WireKind::Null,
            5 => WireKind::Undefined,
            6 => WireKind::Function,
            other => panic!("wire slot discriminant {other} out of range"),
        }
    }

    /// Reassemble the double from the payload words.
    pub fn number_value(&self) -> f64 {
        let bits = (self.payload2 as u64) << 32 | self.payload1 as u64;
        f64::from_bits(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_bits_round_trip() {
        for v in [0.0, -0.0, 1.5, -123.25, f64::MAX, f64::MIN_POSITIVE] {
            let slot = WireSlot::number(v);
            assert_eq!(slot.kind(), WireKind::Number);
            assert_eq!(slot.number_value().to_bits(), v.to_bits());
        }
        let nan = WireSlot::number(f64::NAN);
        assert!(nan.number_value().is_nan());
    }

    #[test]
    fn kind_decodes_every_discriminant() {
        assert_eq!(WireSlot::boolean(true).kind(), WireKind::Boolean);
        assert_eq!(WireSlot::string(7, 3).kind(), WireKind::String);
        assert_eq!(WireSlot::object(9).kind(), WireKind::Object);
        assert_eq!(WireSlot::function(9).kind(), WireKind::Function);
        assert_eq!(WireSlot::null().kind(), WireKind::Null);
        assert_eq!(WireSlot::undefined().kind(), WireKind::Undefined);
    }

    #[test]
    #[should_panic(expected = "discriminant 42 out of range")]
    fn out_of_range_discriminant_is_fatal() {
        let slot = WireSlot {
            kind: 42,
            payload1: 0,
            payload2: 0,
        };
        slot.kind();
    }
}
