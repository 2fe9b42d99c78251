//! Rental Desk Session - client authentication and authorization core.
//!
//! This crate owns everything between the sign-in form and a protected view:
//!
//! - [`store`] - Durable and ephemeral persistence for the token and user
//! - [`machine`] - Pure authentication state machine
//! - [`identity`] - Identity service contract and its in-memory mock
//! - [`controller`] - Action API that ties the three together
//! - [`policy`] / [`gate`] - Role-based route authorization
//! - [`config`] - Environment configuration
//!
//! # Example
//!
//! ```no_run
//! use rental_desk_session::{
//!     FileStore, MockIdentityService, RouteGate, SessionConfig, SessionController,
//! };
//! use rental_desk_core::Role;
//! use secrecy::SecretString;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::from_env()?;
//! let store = FileStore::new(config.storage_dir.clone());
//! let controller = SessionController::new(MockIdentityService::seeded(), store, config);
//! controller.init();
//!
//! let password = SecretString::from("admin123".to_owned());
//! let _ = controller.login("admin@rental.com", &password, true).await;
//!
//! let gate = RouteGate::protected()
//!     .require_role(Role::Admin)
//!     .with_policy(controller.policy());
//! let decision = gate.evaluate(&controller.snapshot(), "/admin/dashboard");
//! # let _ = decision;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod controller;
pub mod error;
pub mod gate;
pub mod identity;
pub mod machine;
pub mod policy;
pub mod store;

pub use config::{ConfigError, SessionConfig};
pub use controller::{ActionOutcome, CallKind, Hydration, SessionController};
pub use error::{AuthFailure, FailureKind};
pub use gate::{GateDecision, RouteGate};
pub use identity::{AuthGrant, IdentityError, IdentityService, MockIdentityService};
pub use machine::{AuthEvent, AuthState, AuthStatus, Session, transition};
pub use policy::AuthorizationPolicy;
pub use store::{FileStore, MemoryStore, SessionStore, StorageScope, StoreError};
