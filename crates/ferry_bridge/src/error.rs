use thiserror::Error;

/// Recoverable bridge errors.
///
/// Protocol violations (bad discriminants, use-after-release, missed
/// releases) are deliberately *not* represented here: they are lifetime
/// contract violations between the two runtimes and abort the guest with
/// a diagnostic instead.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("a host boundary is already installed")]
    AlreadyInstalled,

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}
