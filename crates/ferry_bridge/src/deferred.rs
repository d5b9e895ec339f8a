//! Deferred-completion bridge
//!
//! Wraps the host's promise-equivalent objects so guest code can attach
//! continuations instead of blocking. Purely compositional: everything
//! here goes through the object facade and the closure registry.
//!
//! Every continuation is a registered closure the host may invoke later,
//! so the wrapper retains each registration in `attached` and releases
//! them all when it is torn down. Until then a continuation stays
//! invocable even if the caller holds no other reference to it.

use crate::closure::Closure;
use crate::object::{global, HostRef};
use crate::value::AnyValue;

/// Guest wrapper around a host deferred-completion object.
pub struct Deferred {
    object: HostRef,
    attached: Vec<Closure>,
}

impl Deferred {
    /// Construct a host deferred through the no-failure resolver
    /// pattern: the executor receives the single completion function.
    pub fn new(mut executor: impl FnMut(AnyValue) + 'static) -> Self {
        Self::construct(move |args| {
            executor(args.first().cloned().unwrap_or(AnyValue::Undefined));
            AnyValue::Undefined
        })
    }

    /// Construct a host deferred through the two-closure executor
    /// pattern: the executor receives the fulfill and reject functions.
    pub fn with_rejector(mut executor: impl FnMut(AnyValue, AnyValue) + 'static) -> Self {
        Self::construct(move |args| {
            executor(
                args.first().cloned().unwrap_or(AnyValue::Undefined),
                args.get(1).cloned().unwrap_or(AnyValue::Undefined),
            );
            AnyValue::Undefined
        })
    }

    /// Wrap a deferred object the host already produced.
    pub fn from_object(object: HostRef) -> Self {
        Self {
            object,
            attached: Vec::new(),
        }
    }

    fn construct(body: impl FnMut(&[AnyValue]) -> AnyValue + 'static) -> Self {
        let ctor = match global("Promise") {
            AnyValue::Function(ctor) => ctor,
            other => panic!(
                "host Promise constructor resolved to {}, expected a function",
                other.type_name()
            ),
        };
        let executor = Closure::new(body);
        let object = ctor.construct(&[executor.as_value()]);
        Self {
            object,
            attached: vec![executor],
        }
    }

    pub fn object(&self) -> &HostRef {
        &self.object
    }

    /// Attach a fulfillment continuation; returns the chained deferred.
    pub fn then(
        &mut self,
        mut on_fulfilled: impl FnMut(AnyValue) -> AnyValue + 'static,
    ) -> Deferred {
        self.attach("then", move |args| {
            on_fulfilled(args.first().cloned().unwrap_or(AnyValue::Undefined))
        })
    }

    /// Attach a rejection continuation; returns the chained deferred.
    /// Host-domain failures arrive here as ordinary values, never as
    /// guest faults.
    pub fn catch(
        &mut self,
        mut on_rejected: impl FnMut(AnyValue) -> AnyValue + 'static,
    ) -> Deferred {
        self.attach("catch", move |args| {
            on_rejected(args.first().cloned().unwrap_or(AnyValue::Undefined))
        })
    }

    /// Attach a terminal continuation that runs on settlement either
    /// way.
    pub fn finally(&mut self, mut on_settled: impl FnMut() + 'static) {
        self.attach("finally", move |_| {
            on_settled();
            AnyValue::Undefined
        });
    }

    fn attach(
        &mut self,
        method: &str,
        body: impl FnMut(&[AnyValue]) -> AnyValue + 'static,
    ) -> Deferred {
        let continuation = Closure::new(body);
        let result = self.object.invoke(method, &[continuation.as_value()]);
        self.attached.push(continuation);
        match result {
            AnyValue::Object(object) => Deferred::from_object(object),
            other => panic!(
                "continuation attachment '{method}' returned {}, expected a deferred object",
                other.type_name()
            ),
        }
    }
}

impl Drop for Deferred {
    fn drop(&mut self) {
        for closure in &mut self.attached {
            closure.release();
        }
    }
}
