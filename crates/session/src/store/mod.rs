//! Session persistence.
//!
//! The session is kept under two keys, [`keys::TOKEN`] and [`keys::USER`],
//! in one of two scopes:
//!
//! - [`StorageScope::Durable`] survives restarts ("remember me").
//! - [`StorageScope::Ephemeral`] lives only as long as the current process.
//!
//! Backends implement three raw operations ([`SessionStore::read`],
//! [`SessionStore::write`], [`SessionStore::remove`]); the session-level
//! operations are provided on top of them so every backend shares the same
//! scope policy:
//!
//! - writes go to exactly the scope given and never touch the other one;
//! - reads check the durable scope first and fall back to the ephemeral one;
//! - [`SessionStore::clear`] removes both keys from both scopes.
//!
//! Nothing here synchronizes state between separate processes.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use rental_desk_core::{SessionToken, User};
use thiserror::Error;

/// Storage keys for session data.
pub mod keys {
    /// Key holding the opaque session token.
    pub const TOKEN: &str = "session-token";

    /// Key holding the JSON-serialized user record.
    pub const USER: &str = "session-user";

    /// Every key owned by the session.
    pub const ALL: [&str; 2] = [TOKEN, USER];
}

/// Where a session record lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageScope {
    /// Survives restarts.
    Durable,
    /// Cleared when the process ends.
    Ephemeral,
}

impl StorageScope {
    /// Read order for lookups.
    pub const LOOKUP_ORDER: [Self; 2] = [Self::Durable, Self::Ephemeral];

    /// Scope selected by a remember-me checkbox.
    #[must_use]
    pub const fn from_remember_me(remember_me: bool) -> Self {
        if remember_me {
            Self::Durable
        } else {
            Self::Ephemeral
        }
    }
}

impl std::fmt::Display for StorageScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Durable => f.write_str("durable"),
            Self::Ephemeral => f.write_str("ephemeral"),
        }
    }
}

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be encoded or decoded.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend's lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,

    /// Writing the value would exceed the scope's capacity.
    #[error("storage quota exceeded writing {key} to {scope} scope")]
    QuotaExceeded {
        /// Key being written.
        key: String,
        /// Scope that is full.
        scope: StorageScope,
    },
}

/// Key-value persistence for the session token and user record.
pub trait SessionStore: Send + Sync {
    /// Read a raw value from one scope.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    fn read(&self, scope: StorageScope, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a raw value to one scope, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend rejects the write.
    fn write(&self, scope: StorageScope, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key from one scope. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be modified.
    fn remove(&self, scope: StorageScope, key: &str) -> Result<(), StoreError>;

    /// Store the session token in `scope`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend rejects the write.
    fn set_token(&self, token: &SessionToken, scope: StorageScope) -> Result<(), StoreError> {
        self.write(scope, keys::TOKEN, token.expose())
    }

    /// Read the session token, durable scope first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    fn get_token(&self) -> Result<Option<SessionToken>, StoreError> {
        Ok(self.locate_token()?.map(|(_, token)| token))
    }

    /// Store the user record in `scope` as JSON.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the user cannot be serialized or written.
    fn set_user(&self, user: &User, scope: StorageScope) -> Result<(), StoreError> {
        let json = serde_json::to_string(user)?;
        self.write(scope, keys::USER, &json)
    }

    /// Read the user record, durable scope first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read or the first record
    /// found is not a valid user.
    fn get_user(&self) -> Result<Option<User>, StoreError> {
        for scope in StorageScope::LOOKUP_ORDER {
            if let Some(user) = self.user_in(scope)? {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }

    /// Read the user record from one scope only.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read or the record is
    /// not a valid user.
    fn user_in(&self, scope: StorageScope) -> Result<Option<User>, StoreError> {
        self.read(scope, keys::USER)?
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(StoreError::from)
    }

    /// Find the session token and the scope it was found in.
    ///
    /// Blank tokens are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    fn locate_token(&self) -> Result<Option<(StorageScope, SessionToken)>, StoreError> {
        for scope in StorageScope::LOOKUP_ORDER {
            if let Some(raw) = self.read(scope, keys::TOKEN)? {
                let token = SessionToken::new(raw);
                if !token.is_empty() {
                    return Ok(Some((scope, token)));
                }
            }
        }
        Ok(None)
    }

    /// Remove both keys from both scopes.
    ///
    /// Every removal is attempted even if an earlier one fails; the first
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns the first `StoreError` encountered.
    fn clear(&self) -> Result<(), StoreError> {
        let mut first_error = None;
        for scope in StorageScope::LOOKUP_ORDER {
            for key in keys::ALL {
                if let Err(e) = self.remove(scope, key)
                    && first_error.is_none()
                {
                    first_error = Some(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Returns `true` if neither key is present in `scope`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    fn is_scope_empty(&self, scope: StorageScope) -> Result<bool, StoreError> {
        for key in keys::ALL {
            if self.read(scope, key)?.is_some() {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use chrono::{TimeZone, Utc};
    use rental_desk_core::{ContactInfo, Email, Role, User, UserId, UserStatus};

    /// A fixed customer record for storage tests.
    pub fn customer() -> User {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        let email = Email::parse("customer@rental.com").unwrap();
        User {
            id: UserId::new(3),
            email: email.clone(),
            first_name: "Casey".to_owned(),
            last_name: "Renter".to_owned(),
            role: Role::Customer,
            status: UserStatus::Active,
            contact_info: ContactInfo {
                email,
                phone: "555-0199".to_owned(),
            },
            email_verified: true,
            company_name: None,
            created_at: at,
            updated_at: at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_remember_me_selects_scope() {
        assert_eq!(StorageScope::from_remember_me(true), StorageScope::Durable);
        assert_eq!(
            StorageScope::from_remember_me(false),
            StorageScope::Ephemeral
        );
    }

    #[test]
    fn test_reads_prefer_durable_scope() {
        let store = MemoryStore::new();
        store
            .set_token(&SessionToken::new("ephemeral"), StorageScope::Ephemeral)
            .unwrap();
        store
            .set_token(&SessionToken::new("durable"), StorageScope::Durable)
            .unwrap();

        let (scope, token) = store.locate_token().unwrap().unwrap();
        assert_eq!(scope, StorageScope::Durable);
        assert_eq!(token.expose(), "durable");
    }

    #[test]
    fn test_reads_fall_back_to_ephemeral_scope() {
        let store = MemoryStore::new();
        let user = test_support::customer();
        store.set_user(&user, StorageScope::Ephemeral).unwrap();

        assert_eq!(store.get_user().unwrap(), Some(user));
        assert!(store.user_in(StorageScope::Durable).unwrap().is_none());
    }

    #[test]
    fn test_write_does_not_touch_other_scope() {
        let store = MemoryStore::new();
        store
            .set_token(&SessionToken::new("t"), StorageScope::Durable)
            .unwrap();

        assert!(store.is_scope_empty(StorageScope::Ephemeral).unwrap());
        assert!(!store.is_scope_empty(StorageScope::Durable).unwrap());
    }

    #[test]
    fn test_blank_token_is_absent() {
        let store = MemoryStore::new();
        store
            .write(StorageScope::Durable, keys::TOKEN, "   ")
            .unwrap();

        assert!(store.get_token().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_user_record_is_an_error() {
        let store = MemoryStore::new();
        store
            .write(StorageScope::Durable, keys::USER, "{not json")
            .unwrap();

        assert!(matches!(
            store.get_user(),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = MemoryStore::new();
        store.clear().unwrap();

        store
            .set_token(&SessionToken::new("t"), StorageScope::Durable)
            .unwrap();
        store
            .set_user(&test_support::customer(), StorageScope::Ephemeral)
            .unwrap();
        store.clear().unwrap();
        store.clear().unwrap();

        for scope in StorageScope::LOOKUP_ORDER {
            assert!(store.is_scope_empty(scope).unwrap());
        }
    }
}
