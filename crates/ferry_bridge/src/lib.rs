//! Ferry Bridge
//!
//! Guest-side half of a bidirectional value-marshaling bridge between a
//! statically-typed guest runtime and a dynamically-typed host runtime
//! that communicate only through a numeric call interface.
//!
//! ## Architecture
//!
//! - **Wire codec:** [`AnyValue`] encodes into / decodes from the fixed
//!   width slots of `ferry_abi`
//! - **Host references:** [`HostRef`] wraps an owned host handle and
//!   releases it across the boundary exactly once
//! - **Closure export:** [`Closure`] / [`OneShotClosure`] register guest
//!   callables under integer keys the host can invoke through the
//!   trampoline
//! - **Deferred bridge:** [`Deferred`] wraps the host's
//!   deferred-completion objects for continuation-style waiting
//!
//! Execution is single-threaded cooperative: a boundary call transfers
//! control synchronously and returns before any other boundary activity
//! can occur. All bridge state is therefore thread-local.

pub mod boundary;
pub mod closure;
pub mod deferred;
pub mod error;
pub mod object;
pub mod value;

pub use boundary::install;
pub use closure::{
    call_host_function, registry_stats, Closure, ClosureKind, OneShotClosure, RegistryStats,
};
pub use deferred::Deferred;
pub use error::BridgeError;
pub use object::{global, global_this, HostRef};
pub use value::{AnyValue, SlotWriter};
