//! Integration tests for Rental Desk.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rental-desk-integration-tests
//! ```
//!
//! No external services are needed: every test runs the session controller
//! against the mock identity service and either an in-memory store or a
//! `FileStore` in a temporary directory.
//!
//! # Test Categories
//!
//! - `session_lifecycle` - Sign in, hydration, profile edits, sign out
//! - `overlapping_calls` - Stale results from overlapping actions
//! - `route_gate` - Route authorization driven by live controller state
//! - `storage_degradation` - Storage failures and torn records
//!
//! This library holds the shared fixtures.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use rental_desk_core::{Email, ProfileUpdate, Registration, SessionToken, User};
use rental_desk_session::{
    AuthGrant, FileStore, IdentityError, IdentityService, MockIdentityService, SessionConfig,
    SessionController,
};
use secrecy::SecretString;
use tokio::sync::oneshot;

/// Seeded admin credentials.
pub const ADMIN: (&str, &str) = ("admin@rental.com", "admin123");
/// Seeded staff credentials.
pub const STAFF: (&str, &str) = ("staff@rental.com", "staff123");
/// Seeded customer credentials.
pub const CUSTOMER: (&str, &str) = ("customer@rental.com", "customer123");

/// Wrap a password literal.
#[must_use]
pub fn secret(password: &str) -> SecretString {
    SecretString::from(password.to_owned())
}

/// Controller backed by a `FileStore` under `dir`, as the CLI runs it.
#[must_use]
pub fn file_controller(dir: &Path) -> SessionController<MockIdentityService, FileStore> {
    let config = SessionConfig {
        storage_dir: dir.to_path_buf(),
        ..SessionConfig::default()
    };
    SessionController::new(
        MockIdentityService::seeded(),
        FileStore::new(dir),
        config,
    )
}

/// Mock identity service whose session-changing calls can be held open.
///
/// Each [`hold_next`](Self::hold_next) arms one gate. The next
/// `authenticate` or `update_profile` call takes the oldest armed gate,
/// computes its answer, and waits for the gate to be released before
/// returning it. Calls with no gate armed answer immediately.
#[derive(Debug, Default)]
pub struct GatedIdentity {
    inner: MockIdentityService,
    gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
}

impl GatedIdentity {
    /// Gate the next gated call. Send on (or drop) the returned
    /// sender to let it finish.
    #[must_use]
    pub fn hold_next(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        if let Ok(mut gates) = self.gates.lock() {
            gates.push_back(gate);
        }
        release
    }

    /// The wrapped service.
    #[must_use]
    pub const fn inner(&self) -> &MockIdentityService {
        &self.inner
    }

    fn take_gate(&self) -> Option<oneshot::Receiver<()>> {
        self.gates.lock().ok()?.pop_front()
    }

    async fn wait(gate: Option<oneshot::Receiver<()>>) {
        if let Some(gate) = gate {
            // A dropped sender releases the gate too.
            let _ = gate.await;
        }
    }
}

impl IdentityService for GatedIdentity {
    async fn authenticate(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthGrant, IdentityError> {
        let gate = self.take_gate();
        let result = self.inner.authenticate(email, password).await;
        Self::wait(gate).await;
        result
    }

    async fn register(&self, registration: &Registration) -> Result<AuthGrant, IdentityError> {
        self.inner.register(registration).await
    }

    async fn request_password_reset(&self, email: &Email) -> Result<(), IdentityError> {
        self.inner.request_password_reset(email).await
    }

    async fn complete_password_reset(
        &self,
        reset_token: &str,
        new_password: &SecretString,
    ) -> Result<(), IdentityError> {
        self.inner
            .complete_password_reset(reset_token, new_password)
            .await
    }

    async fn update_profile(
        &self,
        token: &SessionToken,
        update: &ProfileUpdate,
    ) -> Result<User, IdentityError> {
        let gate = self.take_gate();
        let result = self.inner.update_profile(token, update).await;
        Self::wait(gate).await;
        result
    }

    async fn current_user(&self, token: &SessionToken) -> Result<User, IdentityError> {
        self.inner.current_user(token).await
    }
}
