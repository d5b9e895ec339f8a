//! Ferry Test Host
//!
//! A deterministic, in-process host runtime implementing the boundary
//! call interface over a refcounted slot heap. Used by the bridge test
//! suite and the demo binary in place of a real embedder.
//!
//! The mock is a *host*: dynamically typed, identity-based references,
//! promise-equivalent deferred objects with synchronous settlement. It
//! invokes guest thunks through the real trampoline
//! (`ferry_bridge::closure::call_host_function`) and collects results
//! through a native capture callback, so the full delivery path is
//! exercised.
//!
//! Reference slots are deliberately emitted with the `Object`
//! discriminant even for functions, forcing the guest's function
//! predicate probe on every reference decode.

mod host;
mod value;

pub use host::{MockHost, GLOBAL_THIS};
pub use value::HostValue;
