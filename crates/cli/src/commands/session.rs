//! Session lifecycle commands.
//!
//! # Usage
//!
//! ```bash
//! rd-cli login -e staff@rental.com -p staff123 --remember
//! rd-cli register -e jo@example.com -p longpassword --first-name Jo \
//!     --last-name Doe --phone 555-0101 --accept-terms
//! rd-cli whoami
//! rd-cli logout
//! ```

use rental_desk_core::Registration;
use rental_desk_session::StorageScope;
use secrecy::SecretString;

use super::{Controller, print};
use crate::{CliError, finish};

/// Sign in and report where the session landed.
///
/// # Errors
///
/// Returns `CliError::Action` if the credentials are rejected.
pub async fn login(
    controller: &Controller,
    email: &str,
    password: &SecretString,
    remember: bool,
) -> Result<(), CliError> {
    finish(controller.login(email, password, remember).await)?;
    whoami(controller);
    Ok(())
}

/// Create an account, sign in, and report the new user.
///
/// # Errors
///
/// Returns `CliError::Action` if the form is invalid or the account exists.
pub async fn register(controller: &Controller, registration: Registration) -> Result<(), CliError> {
    finish(controller.register(registration).await)?;
    whoami(controller);
    Ok(())
}

/// Sign out and clear the storage directory.
pub fn logout(controller: &Controller) {
    controller.logout();
    print(format!(
        "Signed out (cleared {})",
        controller.store().dir().display()
    ));
}

/// Print the signed-in user and where to send them.
pub fn whoami(controller: &Controller) {
    let state = controller.snapshot();
    let Some(session) = state.session() else {
        print("Not signed in");
        return;
    };

    let user = &session.user;
    let persistence = match session.scope {
        Some(StorageScope::Durable) => "remembered",
        Some(StorageScope::Ephemeral) => "this run only",
        None => "memory only, storage unavailable",
    };
    print(format!("{} <{}>", user.display_name(), user.email));
    print(format!("  role:      {}", user.role));
    print(format!("  phone:     {}", user.contact_info.phone));
    if let Some(company) = &user.company_name {
        print(format!("  company:   {company}"));
    }
    print(format!("  session:   {persistence}"));
    print(format!(
        "  dashboard: {}",
        controller.policy().landing_path(user.role)
    ));
}
