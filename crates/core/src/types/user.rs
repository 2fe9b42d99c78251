//! User records and the payloads that create or modify them.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use super::{Email, Role, UserId, UserStatus};

/// Contact details kept alongside the account email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    /// Address used for rental notifications.
    pub email: Email,
    /// Phone number, free-form.
    pub phone: String,
}

/// A user record as issued by the identity service.
///
/// `id` and `role` are fixed once issued. Profile fields change only through
/// [`ProfileUpdate::apply`]. The JSON form of this struct is what lands in the
/// `session-user` storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(default)]
    pub status: UserStatus,
    pub contact_info: ContactInfo,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Returns "First Last", falling back to the email when both are blank.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        if name.is_empty() {
            self.email.to_string()
        } else {
            name.to_owned()
        }
    }
}

/// Partial user record for profile edits.
///
/// Only `Some` fields are applied. Identity fields (`id`, `role`, account
/// email, `created_at`) are not representable here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<Email>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

impl ProfileUpdate {
    /// Update that only changes the phone number.
    #[must_use]
    pub fn phone(phone: impl Into<String>) -> Self {
        Self {
            phone: Some(phone.into()),
            ..Self::default()
        }
    }

    /// Returns `true` if no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.contact_email.is_none()
            && self.company_name.is_none()
    }

    /// Merge this update into `user`, stamping `updated_at` with `now`.
    #[must_use]
    pub fn apply(&self, user: &User, now: DateTime<Utc>) -> User {
        let mut merged = user.clone();
        if let Some(first_name) = &self.first_name {
            merged.first_name.clone_from(first_name);
        }
        if let Some(last_name) = &self.last_name {
            merged.last_name.clone_from(last_name);
        }
        if let Some(phone) = &self.phone {
            merged.contact_info.phone.clone_from(phone);
        }
        if let Some(contact_email) = &self.contact_email {
            merged.contact_info.email = contact_email.clone();
        }
        if let Some(company_name) = &self.company_name {
            merged.company_name = Some(company_name.clone());
        }
        merged.updated_at = now;
        merged
    }
}

/// Sign-up form as submitted to the identity service.
///
/// `email` is the raw form input; the session controller validates it before
/// anything is sent.
#[derive(Debug)]
pub struct Registration {
    pub email: String,
    pub password: SecretString,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role: Role,
    pub company_name: Option<String>,
    pub accept_terms: bool,
}
