//! Core types for Rental Desk.
//!
//! This module provides type-safe wrappers for the session domain.

pub mod email;
pub mod id;
pub mod status;
pub mod token;
pub mod user;

pub use email::{Email, EmailError};
pub use id::*;
pub use status::*;
pub use token::SessionToken;
pub use user::{ContactInfo, ProfileUpdate, Registration, User};
