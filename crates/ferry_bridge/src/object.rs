//! Host object references and the value facade
//!
//! The guest holds host objects by opaque handle. Each owned handle must
//! be released across the boundary exactly once; `HostRef` shares the
//! handle behind an `Rc` so clones alias without extra boundary traffic
//! and the single release happens when the last clone drops.
//!
//! Every facade operation is the same three-step round trip: encode the
//! arguments, perform one boundary call, decode the result.

use crate::boundary::{boundary, try_boundary};
use crate::value::{AnyValue, SlotWriter};
use ferry_abi::{Handle, WireSlot};
use std::rc::Rc;

struct RawHandle(Handle);

impl Drop for RawHandle {
    fn drop(&mut self) {
        if let Some(b) = try_boundary() {
            b.release(self.0);
        } else {
            tracing::warn!(handle = self.0, "host handle dropped after boundary teardown");
        }
    }
}

/// Owned reference to a host-side object.
#[derive(Clone)]
pub struct HostRef {
    raw: Rc<RawHandle>,
}

impl HostRef {
    /// Wrap a handle whose ownership was transferred to the guest.
    pub(crate) fn from_owned(handle: Handle) -> Self {
        Self {
            raw: Rc::new(RawHandle(handle)),
        }
    }

    pub fn handle(&self) -> Handle {
        self.raw.0
    }

    /// Read the named property.
    pub fn get(&self, name: &str) -> AnyValue {
        let b = boundary();
        let name_ref = b.alloc_string(name);
        let slot = b.get_property(self.handle(), name_ref);
        b.release(name_ref);
        AnyValue::decode(slot)
    }

    /// Write the named property.
    pub fn set(&self, name: &str, value: &AnyValue) {
        let b = boundary();
        let mut writer = SlotWriter::new();
        let slot = writer.slot(value);
        let name_ref = b.alloc_string(name);
        b.set_property(self.handle(), name_ref, slot);
        b.release(name_ref);
    }

    /// Read the indexed element.
    pub fn get_index(&self, index: u32) -> AnyValue {
        let slot = boundary().get_index(self.handle(), index);
        AnyValue::decode(slot)
    }

    /// Write the indexed element.
    pub fn set_index(&self, index: u32, value: &AnyValue) {
        let mut writer = SlotWriter::new();
        let slot = writer.slot(value);
        boundary().set_index(self.handle(), index, slot);
    }

    /// Call this reference as a function with an undefined `this`.
    ///
    /// Arity is not validated here: a mismatch is the host's concern
    /// and surfaces as whatever value the host returns.
    pub fn call(&self, args: &[AnyValue]) -> AnyValue {
        call_with_this(self.handle(), WireSlot::undefined(), args)
    }

    /// Call the named member as a method with this object as `this`.
    ///
    /// Fatal if the member is not a function: the caller asserted a
    /// shape the host does not provide.
    #[track_caller]
    pub fn invoke(&self, name: &str, args: &[AnyValue]) -> AnyValue {
        match self.get(name) {
            AnyValue::Function(func) => {
                call_with_this(func.handle(), WireSlot::object(self.handle()), args)
            }
            other => panic!(
                "expected member '{name}' to be a function, found {}",
                other.type_name()
            ),
        }
    }

    /// Construct a new host object using this reference as constructor.
    pub fn construct(&self, args: &[AnyValue]) -> HostRef {
        let mut writer = SlotWriter::new();
        let slots = writer.slots(args);
        let handle = boundary().call_new(self.handle(), &slots);
        HostRef::from_owned(handle)
    }

    /// Host-side dynamic type check against a constructor.
    pub fn instance_of(&self, ctor: &HostRef) -> bool {
        boundary().instance_of(self.handle(), ctor.handle())
    }
}

fn call_with_this(func: Handle, this: WireSlot, args: &[AnyValue]) -> AnyValue {
    let mut writer = SlotWriter::new();
    let slots = writer.slots(args);
    let result = boundary().call_function(func, this, &slots);
    AnyValue::decode(result)
}

impl PartialEq for HostRef {
    fn eq(&self, other: &Self) -> bool {
        self.handle() == other.handle()
    }
}

impl std::fmt::Debug for HostRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HostRef").field(&self.handle()).finish()
    }
}

/// The well-known root namespace object.
pub fn global_this() -> HostRef {
    HostRef::from_owned(boundary().root())
}

/// Resolve a named global from the root namespace.
pub fn global(name: &str) -> AnyValue {
    global_this().get(name)
}
