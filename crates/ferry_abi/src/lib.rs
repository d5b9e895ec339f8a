//! Ferry ABI
//!
//! Wire-level types shared by both sides of the guest/host boundary:
//! - Tagged fixed-width value slots ([`WireSlot`])
//! - The boundary call interface ([`HostBoundary`])
//!
//! The actual transport (a handful of numeric-signature imports/exports)
//! is provided by the embedder; everything in this crate is
//! transport-agnostic.

pub mod boundary;
pub mod slot;

pub use boundary::{FuncRef, Handle, HostBoundary};
pub use slot::{WireKind, WireSlot};
