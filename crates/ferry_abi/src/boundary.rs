//! Boundary call interface
//!
//! The fixed set of operations the guest may ask of the host. An
//! implementation is installed once at startup (the real transport binds
//! these to numeric imports; tests install an in-process host).
//!
//! ## Handle ownership protocol
//!
//! Handles embedded in a [`WireSlot`] follow one rule:
//! - slots *returned by* a boundary call transfer ownership of their
//!   handles to the receiver (who must eventually `release`);
//! - slots *passed into* a boundary call only lend their handles for the
//!   duration of the call.
//!
//! Argument slots delivered to the guest trampoline count as returned to
//! the guest: the host retains each handle before invoking, the guest
//! releases through the decoded wrappers.

use crate::slot::WireSlot;

/// Opaque integer identifying a host-side object.
pub type Handle = u32;

/// Integer key under which the host knows a guest-registered closure.
pub type FuncRef = u32;

/// Operations the host exposes to the guest.
pub trait HostBoundary {
    /// `object.name`, name passed as a host string handle.
    fn get_property(&self, object: Handle, name: Handle) -> WireSlot;
    /// `object.name = value`.
    fn set_property(&self, object: Handle, name: Handle, value: WireSlot);
    /// `object[index]`.
    fn get_index(&self, object: Handle, index: u32) -> WireSlot;
    /// `object[index] = value`.
    fn set_index(&self, object: Handle, index: u32, value: WireSlot);

    /// Call `func` with the given `this` value and arguments. Arity
    /// mismatches and host-side failures surface in the returned slot,
    /// never as a guest fault.
    fn call_function(&self, func: Handle, this: WireSlot, args: &[WireSlot]) -> WireSlot;
    /// Construct a new host object from `ctor`. The returned handle is
    /// owned by the caller.
    fn call_new(&self, ctor: Handle, args: &[WireSlot]) -> Handle;

    /// Host-side dynamic type check (`object instanceof ctor`).
    fn instance_of(&self, object: Handle, ctor: Handle) -> bool;
    /// Function-ness capability probe, consulted while decoding every
    /// reference slot. The host is the source of truth here.
    fn is_function(&self, object: Handle) -> bool;

    /// Create a host-visible thunk forwarding invocations of `func_ref`
    /// back through the guest trampoline. The returned handle is owned
    /// by the caller.
    fn create_function(&self, func_ref: FuncRef) -> Handle;

    /// Copy guest bytes into a host string; the returned handle is owned
    /// by the caller.
    fn alloc_string(&self, value: &str) -> Handle;
    /// Copy the host string's bytes into guest storage. `byte_len` comes
    /// from the string slot's payload.
    fn read_string(&self, handle: Handle, byte_len: u32) -> String;

    /// Drop one ownership reference to `handle`.
    fn release(&self, handle: Handle);

    /// Owned handle to the global namespace object, from which named
    /// globals are resolved via `get_property`.
    fn root(&self) -> Handle;
}
