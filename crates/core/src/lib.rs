//! Rental Desk Core - Shared types library.
//!
//! This crate provides the data model shared by every Rental Desk component:
//! - `session` - Client session state machine, storage policy, and route gate
//! - `cli` - Command-line front end for signing in and inspecting sessions
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no identity-service calls. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Users, roles, statuses, emails, ids, and session tokens

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
