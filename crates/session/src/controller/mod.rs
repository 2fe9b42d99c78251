//! Session controller.
//!
//! [`SessionController`] owns the authoritative [`AuthState`]. It runs
//! identity calls, feeds their outcomes through [`transition`], and keeps the
//! [`SessionStore`] in step with the in-memory session.
//!
//! # Overlapping calls
//!
//! Actions never block one another. Each takes a ticket from a per-kind
//! generation counter when it is issued; when its call resolves, the outcome
//! is committed only if no newer call of the same kind (or a logout) has been
//! issued since. Stale outcomes are dropped without touching state or
//! storage and reported as [`ActionOutcome::Superseded`].
//!
//! The generation check, the storage write, and the state change all happen
//! under the state channel's write lock, so a logout cannot interleave with
//! a commit.
//!
//! # Storage
//!
//! A session is written as clear, user, token. A crash between the writes
//! leaves a user without a token, which fails to hydrate and is cleared on
//! the next start. If storage rejects a write the session is kept in memory
//! only and storage is emptied.

mod generation;

pub use generation::CallKind;

use rental_desk_core::{Email, ProfileUpdate, Registration, SessionToken, User};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::instrument;

use self::generation::{Generations, Ticket};
use crate::config::SessionConfig;
use crate::error::{AuthFailure, FailureKind};
use crate::identity::{AuthGrant, IdentityService};
use crate::machine::{AuthEvent, AuthState, AuthStatus, Session, transition};
use crate::policy::AuthorizationPolicy;
use crate::store::{SessionStore, StorageScope, StoreError};

/// Shortest password accepted by register and reset.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const INVALID_EMAIL: &str = "Please enter a valid email address";
const TERMS_REQUIRED: &str = "You must accept the terms and conditions";
const PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters";
const RESET_TOKEN_REQUIRED: &str = "Reset token is required";

/// Result of a controller action.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum ActionOutcome {
    /// The call succeeded and its result is reflected in the state.
    Committed,
    /// The call failed. The failure is also the state's error unless another
    /// call has already moved the state on.
    Failed(AuthFailure),
    /// A newer call or a logout made this result stale; it was discarded.
    Superseded,
}

impl ActionOutcome {
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }

    #[must_use]
    pub const fn failure(&self) -> Option<&AuthFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            Self::Committed | Self::Superseded => None,
        }
    }
}

/// What [`SessionController::init`] found in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hydration {
    /// A complete record was restored from this scope.
    Restored(StorageScope),
    /// Storage held no session.
    Empty,
    /// Storage held an incomplete or unreadable record, which was cleared.
    Discarded,
}

/// What a storage scan turned up.
enum StoredSession {
    Empty,
    Torn(&'static str),
    Complete(StorageScope, Session),
}

/// Orchestrates identity calls, state transitions, and session storage.
pub struct SessionController<I, S> {
    identity: I,
    store: S,
    config: SessionConfig,
    state: watch::Sender<AuthState>,
    generations: Generations,
}

impl<I, S> std::fmt::Debug for SessionController<I, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &*self.state.borrow())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<I, S> SessionController<I, S>
where
    I: IdentityService,
    S: SessionStore,
{
    /// Create a controller in the `Idle` state. Call [`init`](Self::init)
    /// to restore a stored session.
    #[must_use]
    pub fn new(identity: I, store: S, config: SessionConfig) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            identity,
            store,
            config,
            state,
            generations: Generations::default(),
        }
    }

    /// Restore a stored session without contacting the identity service.
    ///
    /// Only a token and user found together in the same scope are restored.
    /// Anything else left in storage is cleared. Does nothing if a session
    /// is already held.
    pub fn init(&self) -> Hydration {
        let mut hydration = Hydration::Empty;
        self.state.send_if_modified(|state| {
            if let Some(session) = state.session() {
                if let Some(scope) = session.scope {
                    hydration = Hydration::Restored(scope);
                }
                return false;
            }

            match self.load_stored() {
                StoredSession::Empty => false,
                StoredSession::Torn(reason) => {
                    tracing::warn!(reason, "Discarding incomplete stored session");
                    self.clear_store();
                    hydration = Hydration::Discarded;
                    false
                }
                StoredSession::Complete(scope, session) => {
                    tracing::info!(
                        user_id = %session.user.id,
                        role = %session.user.role,
                        %scope,
                        "Restored stored session"
                    );
                    hydration = Hydration::Restored(scope);
                    apply(state, AuthEvent::Success(session))
                }
            }
        });
        hydration
    }

    /// [`init`](Self::init), then [`verify_session`](Self::verify_session)
    /// if the configuration asks for it.
    pub async fn init_verified(&self) -> Hydration {
        let hydration = self.init();
        if !self.config.verify_on_hydrate || !matches!(hydration, Hydration::Restored(_)) {
            return hydration;
        }

        let verified = self.verify_session().await;
        if verified.is_committed() || self.snapshot().session().is_some() {
            hydration
        } else {
            Hydration::Discarded
        }
    }

    /// Detach every subscriber. Receivers see the channel close.
    pub fn shutdown(self) {
        tracing::debug!(
            subscribers = self.state.receiver_count(),
            "Session controller shut down"
        );
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Receive every state change from now on.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    #[must_use]
    pub const fn identity(&self) -> &I {
        &self.identity
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Authorization policy for gates driven by this controller.
    #[must_use]
    pub fn policy(&self) -> AuthorizationPolicy {
        self.config.policy()
    }

    /// Sign in. With `remember_me` the session is stored durably,
    /// otherwise for this process only.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
        remember_me: bool,
    ) -> ActionOutcome {
        let ticket = self.generations.issue(CallKind::Authenticate);
        self.dispatch(AuthEvent::Start);

        let Ok(email) = Email::parse(email) else {
            return self.fail(&ticket, AuthFailure::validation(INVALID_EMAIL));
        };

        match self.identity.authenticate(&email, password).await {
            Ok(grant) => {
                self.establish(&ticket, grant, StorageScope::from_remember_me(remember_me))
            }
            Err(e) => self.fail(&ticket, e.into()),
        }
    }

    /// Create an account and sign in to it. The session is always stored
    /// durably.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> ActionOutcome {
        let ticket = self.generations.issue(CallKind::Authenticate);
        self.dispatch(AuthEvent::Start);

        if let Err(failure) = validate_registration(&registration) {
            return self.fail(&ticket, failure);
        }

        match self.identity.register(&registration).await {
            Ok(grant) => self.establish(&ticket, grant, StorageScope::Durable),
            Err(e) => self.fail(&ticket, e.into()),
        }
    }

    /// End the session. Clears storage in both scopes and discards the
    /// result of every call still in flight.
    pub fn logout(&self) {
        let was_signed_in = self.state.send_if_modified(|state| {
            self.generations.invalidate_all();
            self.clear_store();
            apply(state, AuthEvent::Logout)
        });
        if was_signed_in {
            tracing::info!("Signed out");
        }
    }

    /// Ask the identity service to send a password reset link.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn forgot_password(&self, email: &str) -> ActionOutcome {
        let ticket = self.generations.issue(CallKind::Recovery);
        self.dispatch(AuthEvent::Start);

        let Ok(email) = Email::parse(email) else {
            return self.fail(&ticket, AuthFailure::validation(INVALID_EMAIL));
        };

        match self.identity.request_password_reset(&email).await {
            Ok(()) => self.resolve(&ticket),
            Err(e) => self.fail(&ticket, e.into()),
        }
    }

    /// Set a new password with a reset token.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        reset_token: &str,
        new_password: &SecretString,
    ) -> ActionOutcome {
        let ticket = self.generations.issue(CallKind::Recovery);
        self.dispatch(AuthEvent::Start);

        if reset_token.trim().is_empty() {
            return self.fail(&ticket, AuthFailure::validation(RESET_TOKEN_REQUIRED));
        }
        if !is_long_enough(new_password) {
            return self.fail(&ticket, AuthFailure::validation(PASSWORD_TOO_SHORT));
        }

        match self
            .identity
            .complete_password_reset(reset_token.trim(), new_password)
            .await
        {
            Ok(()) => self.resolve(&ticket),
            Err(e) => self.fail(&ticket, e.into()),
        }
    }

    /// Edit the signed-in user's profile. The updated user is written back
    /// to the scope the session was stored in.
    ///
    /// An empty update commits without a call.
    #[instrument(skip_all)]
    pub async fn update_profile(&self, update: ProfileUpdate) -> ActionOutcome {
        let ticket = self.generations.issue(CallKind::Profile);
        let Some(session) = self.snapshot().session().cloned() else {
            self.dispatch(AuthEvent::Start);
            return self.fail(&ticket, AuthFailure::unauthenticated());
        };
        if update.is_empty() {
            return ActionOutcome::Committed;
        }

        self.dispatch(AuthEvent::Start);

        let user = match self.identity.update_profile(&session.token, &update).await {
            Ok(user) => user,
            Err(e) => return self.fail(&ticket, e.into()),
        };
        if user.id != session.user.id || user.role != session.user.role {
            tracing::warn!(
                expected = %session.user.id,
                returned = %user.id,
                "Identity service returned a different user"
            );
            return self.fail(
                &ticket,
                AuthFailure::new(
                    FailureKind::Service,
                    "The identity service returned an unexpected account",
                ),
            );
        }

        self.refresh_user(&ticket, user)
    }

    /// Dismiss the current error. Only affects the `Failed` state.
    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| {
            state.status() == AuthStatus::Failed && apply(state, AuthEvent::ClearError)
        });
    }

    /// Check the held token with the identity service and refresh the user.
    ///
    /// A token the service rejects ends the session. If the service cannot
    /// be reached the session is kept.
    #[instrument(skip_all)]
    pub async fn verify_session(&self) -> ActionOutcome {
        let Some(token) = self.snapshot().token().cloned() else {
            return ActionOutcome::Failed(AuthFailure::unauthenticated());
        };
        let ticket = self.generations.issue(CallKind::Authenticate);

        match self.identity.current_user(&token).await {
            Ok(user) => self.refresh_user(&ticket, user),
            Err(e) => {
                let failure = AuthFailure::from(e);
                if failure.is_retryable() {
                    tracing::warn!(error = %failure, "Could not verify session");
                    return match self.resolve(&ticket) {
                        ActionOutcome::Superseded => ActionOutcome::Superseded,
                        ActionOutcome::Committed | ActionOutcome::Failed(_) => {
                            ActionOutcome::Failed(failure)
                        }
                    };
                }
                let current = self.commit(&ticket, |state| {
                    tracing::info!(reason = %failure, "Stored session rejected");
                    self.clear_store();
                    apply(state, AuthEvent::Logout)
                });
                if current {
                    ActionOutcome::Failed(failure)
                } else {
                    superseded(&ticket)
                }
            }
        }
    }

    // =========================================================================
    // Commit helpers
    // =========================================================================

    /// Apply `event` unconditionally.
    fn dispatch(&self, event: AuthEvent) -> bool {
        let name = event.name();
        let applied = self.state.send_if_modified(|state| apply(state, event));
        if !applied {
            tracing::debug!(event = name, "Auth event ignored");
        }
        applied
    }

    /// Run `update` under the state lock if `ticket` is still current.
    /// Returns `false` if the ticket was superseded.
    fn commit(&self, ticket: &Ticket<'_>, update: impl FnOnce(&mut AuthState) -> bool) -> bool {
        let mut current = false;
        self.state.send_if_modified(|state| {
            if !ticket.is_current() {
                return false;
            }
            current = true;
            update(state)
        });
        current
    }

    /// Commit a new session from `grant`, persisted to `scope`.
    fn establish(
        &self,
        ticket: &Ticket<'_>,
        grant: AuthGrant,
        scope: StorageScope,
    ) -> ActionOutcome {
        let current = self.commit(ticket, |state| {
            let stored = self.persist(&grant.user, &grant.token, scope);
            tracing::info!(
                user_id = %grant.user.id,
                role = %grant.user.role,
                scope = ?stored,
                "Signed in"
            );
            apply(
                state,
                AuthEvent::Success(Session {
                    user: grant.user,
                    token: grant.token,
                    scope: stored,
                }),
            )
        });
        if current {
            ActionOutcome::Committed
        } else {
            superseded(ticket)
        }
    }

    /// Commit a refreshed copy of the signed-in user.
    fn refresh_user(&self, ticket: &Ticket<'_>, user: User) -> ActionOutcome {
        let current = self.commit(ticket, |state| {
            let Some(session) = state.session() else {
                return false;
            };
            if session.user.id != user.id {
                return false;
            }

            let mut lost = false;
            if let Some(scope) = session.scope
                && let Err(e) = self.store.set_user(&user, scope)
            {
                tracing::warn!(
                    error = %e,
                    %scope,
                    "Could not store updated user, keeping session in memory"
                );
                self.clear_store();
                lost = true;
            }

            let changed = apply(state, AuthEvent::UpdateUser(user));
            changed | (lost && apply(state, AuthEvent::StorageLost))
        });
        if current {
            ActionOutcome::Committed
        } else {
            superseded(ticket)
        }
    }

    /// Resolve an in-flight call that leaves the session as it was.
    fn resolve(&self, ticket: &Ticket<'_>) -> ActionOutcome {
        let current = self.commit(ticket, |state| {
            // A live call of another kind still owns the loading state.
            !ticket.others_live() && apply(state, AuthEvent::ClearError)
        });
        if current {
            ActionOutcome::Committed
        } else {
            superseded(ticket)
        }
    }

    /// Commit `failure`. A held session is dropped, so its stored copy goes
    /// with it.
    fn fail(&self, ticket: &Ticket<'_>, failure: AuthFailure) -> ActionOutcome {
        let current = self.commit(ticket, |state| {
            let had_session = state.session().is_some();
            let applied = apply(state, AuthEvent::Failure(failure.clone()));
            if applied && had_session {
                self.clear_store();
            }
            applied
        });
        if current {
            tracing::debug!(kind = ?failure.kind, error = %failure, "Action failed");
            ActionOutcome::Failed(failure)
        } else {
            superseded(ticket)
        }
    }

    // =========================================================================
    // Storage helpers
    // =========================================================================

    /// Replace whatever is stored with this session. Returns the scope it
    /// now lives in, or `None` if storage failed and was emptied.
    fn persist(
        &self,
        user: &User,
        token: &SessionToken,
        scope: StorageScope,
    ) -> Option<StorageScope> {
        let written = self
            .store
            .clear()
            .and_then(|()| self.store.set_user(user, scope))
            .and_then(|()| self.store.set_token(token, scope));
        match written {
            Ok(()) => Some(scope),
            Err(e) => {
                tracing::warn!(error = %e, %scope, "Could not store session, keeping it in memory");
                self.clear_store();
                None
            }
        }
    }

    fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Could not clear stored session");
        }
    }

    fn load_stored(&self) -> StoredSession {
        match self.read_stored() {
            Ok(stored) => stored,
            Err(StoreError::Serialization(_)) => StoredSession::Torn("user record is unreadable"),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stored session");
                StoredSession::Torn("storage could not be read")
            }
        }
    }

    fn read_stored(&self) -> Result<StoredSession, StoreError> {
        let Some((scope, token)) = self.store.locate_token()? else {
            let empty = StorageScope::LOOKUP_ORDER
                .into_iter()
                .map(|scope| self.store.is_scope_empty(scope))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .all(|empty| empty);
            return Ok(if empty {
                StoredSession::Empty
            } else {
                StoredSession::Torn("user record without a token")
            });
        };

        Ok(match self.store.user_in(scope)? {
            Some(user) => StoredSession::Complete(
                scope,
                Session {
                    user,
                    token,
                    scope: Some(scope),
                },
            ),
            None => StoredSession::Torn("token without a user record"),
        })
    }
}

/// Apply `event` to `state` in place. Returns `true` if the state changed.
fn apply(state: &mut AuthState, event: AuthEvent) -> bool {
    match transition(state, event) {
        Some(next) => {
            *state = next;
            true
        }
        None => false,
    }
}

fn superseded(ticket: &Ticket<'_>) -> ActionOutcome {
    tracing::debug!(
        kind = %ticket.kind,
        generation = ticket.generation,
        "Discarding stale call result"
    );
    ActionOutcome::Superseded
}

fn is_long_enough(password: &SecretString) -> bool {
    password.expose_secret().chars().count() >= MIN_PASSWORD_LENGTH
}

fn validate_registration(registration: &Registration) -> Result<(), AuthFailure> {
    if Email::parse(&registration.email).is_err() {
        return Err(AuthFailure::validation(INVALID_EMAIL));
    }
    if !registration.accept_terms {
        return Err(AuthFailure::validation(TERMS_REQUIRED));
    }
    if !is_long_enough(&registration.password) {
        return Err(AuthFailure::validation(PASSWORD_TOO_SHORT));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;
