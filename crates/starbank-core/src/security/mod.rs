//! Session/security validator seam.
//!
//! The real validator lives outside the core; the core only consumes the
//! booleans and the compliance level it reports.

use std::future::Future;

use serde::Serialize;

/// Compliance level reported by the validator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compliance {
    /// No issues.
    #[default]
    Compliant,
    /// Issues that warrant attention but not lockout.
    Warning,
    /// Policy violation.
    Violation,
}

/// Snapshot of the security subsystem's state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SecurityStatus {
    /// Whether a session is currently active.
    pub session_active: bool,
    /// Whether key material has been initialized.
    pub keys_initialized: bool,
    /// Whether biometric unlock is enabled.
    pub biometric_enabled: bool,
    /// Current compliance level.
    pub compliance: Compliance,
}

/// External session/security collaborator.
pub trait SecurityValidator: Send + Sync + 'static {
    /// Current security state.
    fn security_status(&self) -> SecurityStatus;

    /// Validates the existing session, returning whether it is still good.
    fn validate_session(&self) -> impl Future<Output = bool> + Send;

    /// Attempts to enable biometric unlock, returning whether it succeeded.
    fn enable_biometric_auth(&self) -> impl Future<Output = bool> + Send;

    /// Rotates key material, returning whether the rotation succeeded.
    fn rotate_keys(&self) -> impl Future<Output = bool> + Send;
}
