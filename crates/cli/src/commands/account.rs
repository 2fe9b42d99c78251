//! Account maintenance commands.

use rental_desk_core::{Email, ProfileUpdate};
use secrecy::SecretString;

use super::{Controller, print};
use crate::{CliError, finish};

/// Request a reset link. The mock service has no mailbox, so the token is
/// printed instead.
///
/// # Errors
///
/// Returns `CliError::Action` if the address is invalid or the service fails.
pub async fn forgot_password(controller: &Controller, email: &str) -> Result<(), CliError> {
    finish(controller.forgot_password(email).await)?;

    print("If an account exists for that address, a reset link has been sent.");
    if let Some(token) = Email::parse(email)
        .ok()
        .and_then(|email| controller.identity().pending_reset_token(&email))
    {
        print(format!("  reset token: {token}"));
    }
    Ok(())
}

/// Set a new password with a reset token.
///
/// # Errors
///
/// Returns `CliError::Action` if the token is unknown or the password is too
/// short.
pub async fn reset_password(
    controller: &Controller,
    token: &str,
    password: &SecretString,
) -> Result<(), CliError> {
    finish(controller.reset_password(token, password).await)?;
    print("Password updated. Sign in with the new password.");
    Ok(())
}

/// Edit the signed-in user's profile.
///
/// # Errors
///
/// Returns `CliError::Action` if nobody is signed in or the service fails.
pub async fn update_profile(
    controller: &Controller,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
) -> Result<(), CliError> {
    let update = ProfileUpdate {
        first_name,
        last_name,
        phone,
        ..ProfileUpdate::default()
    };
    if update.is_empty() {
        print("Nothing to update");
        return Ok(());
    }

    finish(controller.update_profile(update).await)?;
    super::session::whoami(controller);
    Ok(())
}
