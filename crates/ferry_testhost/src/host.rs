//! Mock host runtime
//!
//! Heap slots are never reused: releasing only decrements a counter, so
//! stale handles stay resolvable and leaks show up in `live_handles`
//! instead of as dangling references. This mirrors the process-lifetime
//! simplification of the real bridge registry.

use crate::value::HostValue;
use ferry_abi::{FuncRef, Handle, HostBoundary, WireKind, WireSlot};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Handle of the global namespace object.
pub const GLOBAL_THIS: Handle = 0;
const PROMISE_CTOR: Handle = 1;

type NativeFn = Rc<dyn Fn(&MockHost, &[HostValue]) -> HostValue>;

#[derive(Clone)]
enum FuncKind {
    /// Forwards to a guest-registered closure through the trampoline.
    Thunk(FuncRef),
    PromiseCtor,
    Resolve(Handle),
    Reject(Handle),
    Then(Handle),
    Catch(Handle),
    Finally(Handle),
    /// Result-delivery callback handed to the trampoline.
    Capture(Rc<RefCell<Option<HostValue>>>),
    /// Test-scripted host behavior.
    Native(NativeFn),
}

#[derive(Default)]
struct ObjectData {
    props: HashMap<String, HostValue>,
    elems: Vec<HostValue>,
}

#[derive(Clone)]
enum Settle {
    Pending,
    Fulfilled(HostValue),
    Rejected(HostValue),
}

struct Reaction {
    on_fulfilled: Option<HostValue>,
    on_rejected: Option<HostValue>,
    on_finally: Option<HostValue>,
    chained: Handle,
}

struct DeferredData {
    state: Settle,
    reactions: Vec<Reaction>,
}

enum Entry {
    Object(ObjectData),
    Function(FuncKind),
    Deferred(DeferredData),
    Str(String),
}

struct Slot {
    entry: Entry,
    refs: u32,
}

pub struct MockHost {
    heap: RefCell<Vec<Slot>>,
    /// Net count of handle ownerships held by the guest: incremented
    /// whenever a slot transfers a handle to the guest, decremented on
    /// `release`. Zero after teardown means the guest leaked nothing.
    guest_live: Cell<i64>,
}

impl MockHost {
    pub fn new() -> Rc<MockHost> {
        let mut globals = ObjectData::default();
        globals.props.insert("Promise".to_string(), HostValue::Ref(PROMISE_CTOR));
        let heap = vec![
            Slot {
                entry: Entry::Object(globals),
                refs: 1,
            },
            Slot {
                entry: Entry::Function(FuncKind::PromiseCtor),
                refs: 1,
            },
        ];
        Rc::new(MockHost {
            heap: RefCell::new(heap),
            guest_live: Cell::new(0),
        })
    }

    /// Create a host and install it as the thread's boundary.
    pub fn install() -> Rc<MockHost> {
        let host = MockHost::new();
        ferry_bridge::install(host.clone()).expect("a host boundary is already installed");
        host
    }

    // ------------------------------------------------------------------
    // Heap plumbing
    // ------------------------------------------------------------------

    fn alloc(&self, entry: Entry) -> Handle {
        let mut heap = self.heap.borrow_mut();
        heap.push(Slot { entry, refs: 1 });
        (heap.len() - 1) as Handle
    }

    fn retain(&self, handle: Handle) {
        self.heap.borrow_mut()[handle as usize].refs += 1;
    }

    fn release_internal(&self, handle: Handle) {
        let mut heap = self.heap.borrow_mut();
        let slot = &mut heap[handle as usize];
        slot.refs = slot.refs.saturating_sub(1);
    }

    fn heap_str(&self, handle: Handle) -> String {
        match &self.heap.borrow()[handle as usize].entry {
            Entry::Str(s) => s.clone(),
            _ => panic!("handle {handle} is not a string"),
        }
    }

    fn func_kind(&self, handle: Handle) -> FuncKind {
        match &self.heap.borrow()[handle as usize].entry {
            Entry::Function(kind) => kind.clone(),
            _ => panic!("handle {handle} is not callable"),
        }
    }

    /// Transfer ownership of an existing slot to the guest.
    fn export_ref(&self, handle: Handle) -> WireSlot {
        self.retain(handle);
        self.guest_live.set(self.guest_live.get() + 1);
        // Always the Object discriminant: function-ness is the guest
        // probe's job.
        WireSlot::object(handle)
    }

    /// Allocate a slot whose single reference belongs to the guest.
    fn export_fresh(&self, entry: Entry) -> Handle {
        let handle = self.alloc(entry);
        self.guest_live.set(self.guest_live.get() + 1);
        handle
    }

    fn export_value(&self, value: &HostValue) -> WireSlot {
        match value {
            HostValue::Undefined => WireSlot::undefined(),
            HostValue::Null => WireSlot::null(),
            HostValue::Bool(b) => WireSlot::boolean(*b),
            HostValue::Num(n) => WireSlot::number(*n),
            HostValue::Str(s) => {
                let len = s.len() as u32;
                let handle = self.export_fresh(Entry::Str(s.clone()));
                WireSlot::string(handle, len)
            }
            HostValue::Ref(handle) => self.export_ref(*handle),
        }
    }

    /// Host-side view of a slot lent by the guest. Handles are borrowed,
    /// not adopted.
    fn import_value(&self, slot: &WireSlot) -> HostValue {
        match slot.kind() {
            WireKind::Boolean => HostValue::Bool(slot.payload1 != 0),
            WireKind::Number => HostValue::Num(slot.number_value()),
            WireKind::Null => HostValue::Null,
            WireKind::Undefined => HostValue::Undefined,
            WireKind::String => HostValue::Str(self.heap_str(slot.payload1)),
            WireKind::Object | WireKind::Function => HostValue::Ref(slot.payload1),
        }
    }

    /// Take ownership of a guest-encoded slot as if this host had
    /// produced it, so it can be fed back through `AnyValue::decode`.
    pub fn adopt_slot(&self, slot: WireSlot) {
        match slot.kind() {
            WireKind::String | WireKind::Object | WireKind::Function => {
                self.retain(slot.payload1);
                self.guest_live.set(self.guest_live.get() + 1);
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    /// Run a guest closure through the real trampoline and collect the
    /// result it delivers to the capture callback.
    fn invoke_guest(&self, func_ref: FuncRef, args: &[HostValue]) -> HostValue {
        let captured: Rc<RefCell<Option<HostValue>>> = Rc::new(RefCell::new(None));
        let callback = self.alloc(Entry::Function(FuncKind::Capture(captured.clone())));
        // Trampoline argv is owned by the guest: export retains each
        // reference, the guest releases through its decoded wrappers.
        let argv: Vec<WireSlot> = args.iter().map(|a| self.export_value(a)).collect();
        tracing::trace!(func_ref, argc = argv.len(), "invoking guest thunk");
        ferry_bridge::call_host_function(func_ref, &argv, callback);
        self.release_internal(callback);
        let result = captured.borrow_mut().take();
        result.unwrap_or(HostValue::Undefined)
    }

    fn call_value(&self, func: Handle, args: Vec<HostValue>) -> HostValue {
        let first = || args.first().cloned().unwrap_or(HostValue::Undefined);
        match self.func_kind(func) {
            FuncKind::Thunk(func_ref) => self.invoke_guest(func_ref, &args),
            FuncKind::Capture(cell) => {
                *cell.borrow_mut() = Some(first());
                HostValue::Undefined
            }
            FuncKind::PromiseCtor => panic!("Promise constructor requires new"),
            FuncKind::Resolve(deferred) => {
                self.settle(deferred, Settle::Fulfilled(first()));
                HostValue::Undefined
            }
            FuncKind::Reject(deferred) => {
                self.settle(deferred, Settle::Rejected(first()));
                HostValue::Undefined
            }
            FuncKind::Then(promise) => {
                let chained =
                    self.add_reaction(promise, handler(args.first()), handler(args.get(1)), None);
                HostValue::Ref(chained)
            }
            FuncKind::Catch(promise) => {
                let chained = self.add_reaction(promise, None, handler(args.first()), None);
                HostValue::Ref(chained)
            }
            FuncKind::Finally(promise) => {
                let chained = self.add_reaction(promise, None, None, handler(args.first()));
                HostValue::Ref(chained)
            }
            FuncKind::Native(f) => f(self, &args),
        }
    }

    fn call_handler(&self, callable: &HostValue, args: &[HostValue]) -> HostValue {
        match callable {
            HostValue::Ref(handle) => self.call_value(*handle, args.to_vec()),
            other => panic!("continuation handler {other:?} is not callable"),
        }
    }

    // ------------------------------------------------------------------
    // Deferred semantics (synchronous settlement)
    // ------------------------------------------------------------------

    fn settle(&self, deferred: Handle, outcome: Settle) {
        let reactions = {
            let mut heap = self.heap.borrow_mut();
            match &mut heap[deferred as usize].entry {
                Entry::Deferred(data) => {
                    if !matches!(data.state, Settle::Pending) {
                        // Settles once; later attempts are ignored.
                        return;
                    }
                    data.state = outcome.clone();
                    std::mem::take(&mut data.reactions)
                }
                _ => panic!("handle {deferred} is not a deferred"),
            }
        };
        for reaction in reactions {
            self.run_reaction(reaction, &outcome);
        }
    }

    fn add_reaction(
        &self,
        promise: Handle,
        on_fulfilled: Option<HostValue>,
        on_rejected: Option<HostValue>,
        on_finally: Option<HostValue>,
    ) -> Handle {
        let chained = self.alloc(Entry::Deferred(DeferredData {
            state: Settle::Pending,
            reactions: Vec::new(),
        }));
        let reaction = Reaction {
            on_fulfilled,
            on_rejected,
            on_finally,
            chained,
        };
        let state = {
            let heap = self.heap.borrow();
            match &heap[promise as usize].entry {
                Entry::Deferred(data) => data.state.clone(),
                _ => panic!("handle {promise} is not a deferred"),
            }
        };
        match state {
            Settle::Pending => {
                let mut heap = self.heap.borrow_mut();
                match &mut heap[promise as usize].entry {
                    Entry::Deferred(data) => data.reactions.push(reaction),
                    _ => unreachable!(),
                }
            }
            settled => self.run_reaction(reaction, &settled),
        }
        chained
    }

    fn run_reaction(&self, reaction: Reaction, outcome: &Settle) {
        if let Some(on_finally) = &reaction.on_finally {
            self.call_handler(on_finally, &[]);
            self.settle(reaction.chained, outcome.clone());
            return;
        }
        match outcome {
            Settle::Fulfilled(value) => match &reaction.on_fulfilled {
                Some(f) => {
                    let out = self.call_handler(f, &[value.clone()]);
                    self.settle(reaction.chained, Settle::Fulfilled(out));
                }
                None => self.settle(reaction.chained, Settle::Fulfilled(value.clone())),
            },
            Settle::Rejected(reason) => match &reaction.on_rejected {
                Some(f) => {
                    let out = self.call_handler(f, &[reason.clone()]);
                    self.settle(reaction.chained, Settle::Fulfilled(out));
                }
                None => self.settle(reaction.chained, Settle::Rejected(reason.clone())),
            },
            Settle::Pending => unreachable!("reaction ran against a pending state"),
        }
    }

    // ------------------------------------------------------------------
    // Test helpers
    // ------------------------------------------------------------------

    pub fn set_global(&self, name: &str, value: HostValue) {
        let mut heap = self.heap.borrow_mut();
        match &mut heap[GLOBAL_THIS as usize].entry {
            Entry::Object(data) => {
                data.props.insert(name.to_string(), value);
            }
            _ => unreachable!(),
        }
    }

    pub fn make_object(&self, props: &[(&str, HostValue)]) -> HostValue {
        let mut data = ObjectData::default();
        for (name, value) in props {
            data.props.insert((*name).to_string(), value.clone());
        }
        HostValue::Ref(self.alloc(Entry::Object(data)))
    }

    pub fn make_native(
        &self,
        f: impl Fn(&MockHost, &[HostValue]) -> HostValue + 'static,
    ) -> HostValue {
        HostValue::Ref(self.alloc(Entry::Function(FuncKind::Native(Rc::new(f)))))
    }

    /// Net handle ownerships currently held by the guest.
    pub fn live_handles(&self) -> i64 {
        self.guest_live.get()
    }
}

fn handler(value: Option<&HostValue>) -> Option<HostValue> {
    value
        .filter(|v| !matches!(v, HostValue::Undefined | HostValue::Null))
        .cloned()
}

impl HostBoundary for MockHost {
    fn get_property(&self, object: Handle, name: Handle) -> WireSlot {
        let name = self.heap_str(name);
        enum Got {
            Value(HostValue),
            Method(FuncKind),
        }
        let got = {
            let heap = self.heap.borrow();
            match &heap[object as usize].entry {
                Entry::Object(data) => {
                    Got::Value(data.props.get(&name).cloned().unwrap_or(HostValue::Undefined))
                }
                Entry::Deferred(_) => match name.as_str() {
                    "then" => Got::Method(FuncKind::Then(object)),
                    "catch" => Got::Method(FuncKind::Catch(object)),
                    "finally" => Got::Method(FuncKind::Finally(object)),
                    _ => Got::Value(HostValue::Undefined),
                },
                Entry::Function(_) | Entry::Str(_) => Got::Value(HostValue::Undefined),
            }
        };
        match got {
            Got::Value(value) => self.export_value(&value),
            Got::Method(kind) => {
                let handle = self.export_fresh(Entry::Function(kind));
                WireSlot::object(handle)
            }
        }
    }

    fn set_property(&self, object: Handle, name: Handle, value: WireSlot) {
        let name = self.heap_str(name);
        let value = self.import_value(&value);
        let mut heap = self.heap.borrow_mut();
        match &mut heap[object as usize].entry {
            Entry::Object(data) => {
                data.props.insert(name, value);
            }
            _ => panic!("cannot set property '{name}' on a non-object"),
        }
    }

    fn get_index(&self, object: Handle, index: u32) -> WireSlot {
        let value = {
            let heap = self.heap.borrow();
            match &heap[object as usize].entry {
                Entry::Object(data) => data
                    .elems
                    .get(index as usize)
                    .cloned()
                    .unwrap_or(HostValue::Undefined),
                _ => panic!("indexed access on a non-object"),
            }
        };
        self.export_value(&value)
    }

    fn set_index(&self, object: Handle, index: u32, value: WireSlot) {
        let value = self.import_value(&value);
        let mut heap = self.heap.borrow_mut();
        match &mut heap[object as usize].entry {
            Entry::Object(data) => {
                let index = index as usize;
                if data.elems.len() <= index {
                    data.elems.resize(index + 1, HostValue::Undefined);
                }
                data.elems[index] = value;
            }
            _ => panic!("indexed access on a non-object"),
        }
    }

    fn call_function(&self, func: Handle, _this: WireSlot, args: &[WireSlot]) -> WireSlot {
        let args: Vec<HostValue> = args.iter().map(|slot| self.import_value(slot)).collect();
        let result = self.call_value(func, args);
        self.export_value(&result)
    }

    fn call_new(&self, ctor: Handle, args: &[WireSlot]) -> Handle {
        match self.func_kind(ctor) {
            FuncKind::PromiseCtor => {
                let deferred = self.export_fresh(Entry::Deferred(DeferredData {
                    state: Settle::Pending,
                    reactions: Vec::new(),
                }));
                let resolve = self.alloc(Entry::Function(FuncKind::Resolve(deferred)));
                let reject = self.alloc(Entry::Function(FuncKind::Reject(deferred)));
                let executor = args
                    .first()
                    .map(|slot| self.import_value(slot))
                    .unwrap_or(HostValue::Undefined);
                self.call_handler(
                    &executor,
                    &[HostValue::Ref(resolve), HostValue::Ref(reject)],
                );
                self.release_internal(resolve);
                self.release_internal(reject);
                deferred
            }
            _ => panic!("handle {ctor} is not a constructor"),
        }
    }

    fn instance_of(&self, object: Handle, ctor: Handle) -> bool {
        ctor == PROMISE_CTOR
            && matches!(
                self.heap.borrow()[object as usize].entry,
                Entry::Deferred(_)
            )
    }

    fn is_function(&self, object: Handle) -> bool {
        matches!(
            self.heap.borrow()[object as usize].entry,
            Entry::Function(_)
        )
    }

    fn create_function(&self, func_ref: FuncRef) -> Handle {
        self.export_fresh(Entry::Function(FuncKind::Thunk(func_ref)))
    }

    fn alloc_string(&self, value: &str) -> Handle {
        self.export_fresh(Entry::Str(value.to_string()))
    }

    fn read_string(&self, handle: Handle, byte_len: u32) -> String {
        let s = self.heap_str(handle);
        debug_assert_eq!(s.len(), byte_len as usize);
        s
    }

    fn release(&self, handle: Handle) {
        self.guest_live.set(self.guest_live.get() - 1);
        self.release_internal(handle);
    }

    fn root(&self) -> Handle {
        self.retain(GLOBAL_THIS);
        self.guest_live.set(self.guest_live.get() + 1);
        GLOBAL_THIS
    }
}
