//! User-facing failure carried in the auth state.

use serde::Serialize;

use crate::identity::IdentityError;

/// Category of a failed action, so the UI can tell "check your details"
/// apart from "try again later".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Wrong credentials, duplicate account, bad reset token.
    Credentials,
    /// The identity service or local storage could not complete the call.
    Service,
    /// The input was rejected before anything was sent.
    Validation,
    /// The action needs a signed-in session.
    Unauthenticated,
}

/// A failed action as shown to the user.
///
/// `message` is displayed verbatim next to the form that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct AuthFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl AuthFailure {
    /// Create a failure of the given kind.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Input rejected before any call was made.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, message)
    }

    /// Action attempted without a session.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::new(
            FailureKind::Unauthenticated,
            "You must be signed in to do that",
        )
    }

    /// Returns `true` if retrying the same input could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind, FailureKind::Service)
    }
}

impl From<IdentityError> for AuthFailure {
    fn from(err: IdentityError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_errors_keep_their_message() {
        let failure = AuthFailure::from(IdentityError::InvalidCredentials);
        assert_eq!(failure.kind, FailureKind::Credentials);
        assert_eq!(failure.to_string(), "Invalid email or password");
        assert!(!failure.is_retryable());
    }

    #[test]
    fn test_unavailable_service_is_retryable() {
        let failure = AuthFailure::from(IdentityError::Unavailable("timeout".to_owned()));
        assert_eq!(failure.kind, FailureKind::Service);
        assert!(failure.is_retryable());
    }
}
