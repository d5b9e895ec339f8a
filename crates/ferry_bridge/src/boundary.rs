//! Active host boundary
//!
//! The bridge talks to exactly one host, installed once at startup and
//! kept for the life of the process (init-on-first-use, no teardown).
//! State is thread-local because the execution model is single-threaded
//! cooperative; nothing behind the boundary needs to be `Send`.

use crate::error::BridgeError;
use ferry_abi::HostBoundary;
use once_cell::unsync::OnceCell;
use std::rc::Rc;

thread_local! {
    static BOUNDARY: OnceCell<Rc<dyn HostBoundary>> = OnceCell::new();
}

/// Install the host boundary. May be called once; a second install is
/// rejected rather than silently swapping hosts under live handles.
pub fn install(host: Rc<dyn HostBoundary>) -> Result<(), BridgeError> {
    BOUNDARY.with(|cell| cell.set(host).map_err(|_| BridgeError::AlreadyInstalled))?;
    tracing::info!("host boundary installed");
    Ok(())
}

/// The active boundary. Using the bridge before `install` is a setup
/// bug, not a runtime condition, so this is fatal.
pub(crate) fn boundary() -> Rc<dyn HostBoundary> {
    try_boundary().unwrap_or_else(|| panic!("host boundary not installed"))
}

/// Non-fatal lookup for drop paths, where the boundary may already be
/// gone during thread teardown.
pub(crate) fn try_boundary() -> Option<Rc<dyn HostBoundary>> {
    BOUNDARY.with(|cell| cell.get().cloned())
}
