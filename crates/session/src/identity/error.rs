//! Identity service error types.

use thiserror::Error;

use crate::error::FailureKind;

/// Errors returned by an [`IdentityService`](super::IdentityService).
///
/// The `Display` text of each variant is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Wrong email or password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Registration for an email that already has an account.
    #[error("An account with this email already exists")]
    AlreadyRegistered,

    /// Password reset token unknown, used, or expired.
    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    /// Session token not recognized by the service.
    #[error("Your session has expired, please sign in again")]
    SessionExpired,

    /// Request refused for another stated reason.
    #[error("{0}")]
    Rejected(String),

    /// Service unreachable or failing.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl IdentityError {
    /// Failure category shown to the user.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidCredentials
            | Self::AlreadyRegistered
            | Self::InvalidResetToken
            | Self::Rejected(_) => FailureKind::Credentials,
            Self::SessionExpired => FailureKind::Unauthenticated,
            Self::Unavailable(_) => FailureKind::Service,
        }
    }
}
