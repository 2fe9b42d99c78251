//! Identity service seam.
//!
//! The backend that checks credentials and issues tokens is an external
//! collaborator. [`IdentityService`] is the contract the session controller
//! relies on; [`MockIdentityService`] is the in-memory stand-in the client
//! ships with.

mod error;
mod mock;

pub use error::IdentityError;
pub use mock::MockIdentityService;

use std::future::Future;

use rental_desk_core::{Email, ProfileUpdate, Registration, SessionToken, User};
use secrecy::SecretString;

/// A user and the token issued for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    pub user: User,
    pub token: SessionToken,
}

/// Operations offered by the identity backend.
///
/// Every call is fallible and may take arbitrarily long; the controller
/// never assumes ordering between overlapping calls.
pub trait IdentityService: Send + Sync {
    /// Check credentials and issue a session.
    fn authenticate(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> impl Future<Output = Result<AuthGrant, IdentityError>> + Send;

    /// Create an account and issue a session for it.
    fn register(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = Result<AuthGrant, IdentityError>> + Send;

    /// Send a password reset link to `email`.
    fn request_password_reset(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<(), IdentityError>> + Send;

    /// Set a new password using a reset token.
    fn complete_password_reset(
        &self,
        reset_token: &str,
        new_password: &SecretString,
    ) -> impl Future<Output = Result<(), IdentityError>> + Send;

    /// Apply a profile edit and return the updated record.
    fn update_profile(
        &self,
        token: &SessionToken,
        update: &ProfileUpdate,
    ) -> impl Future<Output = Result<User, IdentityError>> + Send;

    /// Resolve a token to its user. Used to verify a hydrated session.
    fn current_user(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<User, IdentityError>> + Send;
}
