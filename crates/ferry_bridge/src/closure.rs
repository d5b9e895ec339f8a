//! Closure registry and export
//!
//! The host knows guest closures only by integer key (`FuncRef`), so the
//! bridge keeps a process-wide table mapping keys to registered bodies.
//! The table is init-on-first-use with no teardown, and thread-local
//! because execution is single-threaded cooperative (insertion and
//! removal can never be interleaved with a suspension).
//!
//! Lifetimes are manual: the host cannot notify the guest when it drops
//! the last reference to a thunk, so the owner of a reusable
//! registration must call `release` before dropping it. Invoking a key
//! that is no longer in the table is a use-after-release and fatal by
//! contract; returning undefined instead would hide the lifetime bug.

use crate::boundary::boundary;
use crate::object::HostRef;
use crate::value::{AnyValue, SlotWriter};
use ferry_abi::{FuncRef, Handle, WireSlot};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

type ClosureBody = Box<dyn FnMut(&[AnyValue]) -> AnyValue>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClosureKind {
    /// Released by the trampoline itself after exactly one invocation.
    OneShot,
    /// Stays registered until the owner calls `release`.
    Reusable,
}

#[derive(Clone)]
struct Registration {
    body: Rc<RefCell<ClosureBody>>,
    kind: ClosureKind,
}

thread_local! {
    static REGISTRY: RefCell<HashMap<FuncRef, Registration>> = RefCell::new(HashMap::new());
    // Monotonic key allocator. Keys derived from callable identity
    // hashes can collide; a counter cannot.
    static NEXT_FUNC_REF: Cell<FuncRef> = const { Cell::new(1) };
}

fn register(
    kind: ClosureKind,
    body: impl FnMut(&[AnyValue]) -> AnyValue + 'static,
) -> (FuncRef, HostRef) {
    let func_ref = NEXT_FUNC_REF.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    });
    REGISTRY.with(|registry| {
        registry.borrow_mut().insert(
            func_ref,
            Registration {
                body: Rc::new(RefCell::new(Box::new(body))),
                kind,
            },
        );
    });
    let thunk = HostRef::from_owned(boundary().create_function(func_ref));
    tracing::debug!(func_ref, ?kind, "registered closure");
    (func_ref, thunk)
}

fn unregister(func_ref: FuncRef) {
    // Removal of an absent key is a no-op; release is idempotent at the
    // registry level.
    let removed = REGISTRY.with(|registry| registry.borrow_mut().remove(&func_ref).is_some());
    if removed {
        tracing::debug!(func_ref, "released closure");
    }
}

/// A guest callable exported to the host, invocable any number of times.
///
/// The owner must call [`Closure::release`] before dropping it; dropping
/// an unreleased reusable closure is fatal because the host may still
/// hold the thunk and a later invocation would dereference a missing
/// registration.
pub struct Closure {
    func_ref: FuncRef,
    thunk: HostRef,
    released: bool,
}

impl Closure {
    pub fn new(body: impl FnMut(&[AnyValue]) -> AnyValue + 'static) -> Self {
        let (func_ref, thunk) = register(ClosureKind::Reusable, body);
        Self {
            func_ref,
            thunk,
            released: false,
        }
    }

    pub fn func_ref(&self) -> FuncRef {
        self.func_ref
    }

    /// The host-visible function object forwarding to this closure.
    pub fn thunk(&self) -> &HostRef {
        &self.thunk
    }

    pub fn as_value(&self) -> AnyValue {
        AnyValue::Function(self.thunk.clone())
    }

    /// Remove the registration. Safe to call even if the host never
    /// invoked the thunk, and idempotent: a second call is a no-op.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        unregister(self.func_ref);
    }
}

impl Drop for Closure {
    fn drop(&mut self) {
        if !self.released {
            if std::thread::panicking() {
                // Keep the original diagnostic; a second panic here
                // would abort before it is reported.
                tracing::error!(
                    func_ref = self.func_ref,
                    "reusable closure dropped without release during unwind"
                );
            } else {
                panic!(
                    "reusable closure {} dropped without release; \
                     the host may still invoke its thunk",
                    self.func_ref
                );
            }
        }
    }
}

/// A guest callable exported to the host for exactly one invocation.
///
/// The trampoline removes the registration before running the body, so
/// a second invocation attempt misses the table and is fatal. Dropping
/// a one-shot is always safe; if it never fired, the registration stays
/// in the process-lifetime table unless [`OneShotClosure::release`] is
/// called first.
pub struct OneShotClosure {
    func_ref: FuncRef,
    thunk: HostRef,
}

impl OneShotClosure {
    pub fn new(body: impl FnMut(&[AnyValue]) -> AnyValue + 'static) -> Self {
        let (func_ref, thunk) = register(ClosureKind::OneShot, body);
        Self { func_ref, thunk }
    }

    pub fn func_ref(&self) -> FuncRef {
        self.func_ref
    }

    pub fn thunk(&self) -> &HostRef {
        &self.thunk
    }

    pub fn as_value(&self) -> AnyValue {
        AnyValue::Function(self.thunk.clone())
    }

    /// Cancel a one-shot that was never invoked. Idempotent, and safe
    /// after the single invocation already removed the registration.
    pub fn release(&mut self) {
        unregister(self.func_ref);
    }
}

/// Trampoline: host-initiated invocation of a registered closure.
///
/// Runs synchronously on the single logical thread: arguments are
/// decoded, the body is invoked, and the encoded result is delivered by
/// calling `callback` as a host function, all before this returns.
/// Argument slots are owned by the guest (the host retains before
/// invoking); `callback` is only borrowed.
pub fn call_host_function(func_ref: FuncRef, argv: &[WireSlot], callback: Handle) {
    let registration = REGISTRY.with(|registry| registry.borrow().get(&func_ref).cloned());
    let Some(registration) = registration else {
        panic!("host function ref {func_ref} invoked after release (or never registered)");
    };
    if registration.kind == ClosureKind::OneShot {
        // Transition to Released before the body runs so that exactly
        // one invocation can ever observe the registration.
        unregister(func_ref);
    }

    let args: Vec<AnyValue> = argv.iter().map(|slot| AnyValue::decode(*slot)).collect();
    tracing::trace!(func_ref, argc = args.len(), "trampoline invocation");

    let result = {
        let mut body = registration.body.borrow_mut();
        (*body)(&args)
    };

    let mut writer = SlotWriter::new();
    let slot = writer.slot(&result);
    let ack = boundary().call_function(callback, WireSlot::undefined(), &[slot]);
    // The delivery call's return follows the same ownership rule as any
    // other boundary result: decode it so a reference value releases
    // its handle when the wrapper drops.
    drop(AnyValue::decode(ack));
}

/// Snapshot of the registry for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub active: usize,
    pub reusable: usize,
    pub one_shot: usize,
}

pub fn registry_stats() -> RegistryStats {
    REGISTRY.with(|registry| {
        let registry = registry.borrow();
        let reusable = registry
            .values()
            .filter(|r| r.kind == ClosureKind::Reusable)
            .count();
        RegistryStats {
            active: registry.len(),
            reusable,
            one_shot: registry.len() - reusable,
        }
    })
}
