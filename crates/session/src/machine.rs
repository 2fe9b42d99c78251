//! Authentication state machine.
//!
//! [`transition`] is a pure function from the current [`AuthState`] and an
//! [`AuthEvent`] to the next state. It performs no I/O; the session
//! controller decides which events to dispatch and when.
//!
//! ```text
//!            START                      SUCCESS
//!   Idle ───────────► Authenticating ───────────► Authenticated
//!    ▲  ▲                 │     ▲                     │   │
//!    │  │ CLEAR_ERROR     │     │ START               │   │ UPDATE_USER
//!    │  │                 │     └─────────────────────┘   ▼
//!    │  └──── Failed ◄────┘ FAILURE                  Authenticated
//!    │
//!    └──────────── LOGOUT (from any state)
//! ```
//!
//! Invariants upheld by every transition:
//!
//! - user and token are present together or not at all ([`Session`] holds both);
//! - an error is present only in [`AuthStatus::Failed`].

use rental_desk_core::{SessionToken, User};

use crate::error::AuthFailure;
use crate::store::StorageScope;

/// Coarse authentication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthStatus {
    /// No session, nothing in flight.
    #[default]
    Idle,
    /// A call is in flight; the previous session (if any) is still held.
    Authenticating,
    /// A session is held.
    Authenticated,
    /// The last call failed; no session is held.
    Failed,
}

impl std::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// An authenticated user, their token, and where the pair is persisted.
///
/// `scope` is fixed when the session is created and reused by every later
/// write. `None` means storage failed and the session lives in memory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub token: SessionToken,
    pub scope: Option<StorageScope>,
}

/// Snapshot of the client's authentication state.
///
/// Fields are private so that only [`transition`] can produce states, which
/// keeps the invariants above intact.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthState {
    status: AuthStatus,
    session: Option<Session>,
    error: Option<AuthFailure>,
}

impl AuthState {
    #[must_use]
    pub const fn status(&self) -> AuthStatus {
        self.status
    }

    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    #[must_use]
    pub fn token(&self) -> Option<&SessionToken> {
        self.session.as_ref().map(|s| &s.token)
    }

    #[must_use]
    pub const fn error(&self) -> Option<&AuthFailure> {
        self.error.as_ref()
    }

    /// `true` while a call is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.status, AuthStatus::Authenticating)
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.status, AuthStatus::Authenticated)
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A call was issued.
    Start,
    /// A session was established (login, register, or hydration).
    Success(Session),
    /// A call failed.
    Failure(AuthFailure),
    /// The session was ended locally.
    Logout,
    /// The identity service returned a new version of the signed-in user.
    UpdateUser(User),
    /// Dismiss the current error, or resolve an in-flight call that does not
    /// change the session.
    ClearError,
    /// Persisting the session failed; keep it in memory only.
    StorageLost,
}

impl AuthEvent {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Success(_) => "SUCCESS",
            Self::Failure(_) => "FAILURE",
            Self::Logout => "LOGOUT",
            Self::UpdateUser(_) => "UPDATE_USER",
            Self::ClearError => "CLEAR_ERROR",
            Self::StorageLost => "STORAGE_LOST",
        }
    }
}

/// Compute the state that follows `state` on `event`.
///
/// Returns `None` when the event does not change the state, either because
/// it does not apply in the current status or because it is a no-op there.
#[must_use]
pub fn transition(state: &AuthState, event: AuthEvent) -> Option<AuthState> {
    use AuthStatus::{Authenticated, Authenticating, Failed, Idle};

    match event {
        AuthEvent::Start => Some(AuthState {
            status: Authenticating,
            session: state.session.clone(),
            error: None,
        }),

        AuthEvent::Success(session) => Some(AuthState {
            status: Authenticated,
            session: Some(session),
            error: None,
        }),

        AuthEvent::Failure(failure) => (state.status == Authenticating).then(|| AuthState {
            status: Failed,
            session: None,
            error: Some(failure),
        }),

        AuthEvent::Logout => {
            let idle = AuthState::default();
            (*state != idle).then_some(idle)
        }

        AuthEvent::UpdateUser(user) => match (&state.status, &state.session) {
            (Authenticated | Authenticating, Some(session)) if session.user.id == user.id => {
                Some(AuthState {
                    status: Authenticated,
                    session: Some(Session {
                        user,
                        ..session.clone()
                    }),
                    error: None,
                })
            }
            _ => None,
        },

        AuthEvent::ClearError => match state.status {
            Failed => Some(AuthState::default()),
            Authenticating => Some(AuthState {
                status: if state.session.is_some() {
                    Authenticated
                } else {
                    Idle
                },
                session: state.session.clone(),
                error: None,
            }),
            Idle | Authenticated => None,
        },

        AuthEvent::StorageLost => {
            let session = state.session.as_ref()?;
            session.scope?;
            Some(AuthState {
                status: state.status,
                session: Some(Session {
                    scope: None,
                    ..session.clone()
                }),
                error: state.error.clone(),
            })
        }
    }
}
