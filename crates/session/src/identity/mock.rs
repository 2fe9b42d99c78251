//! In-memory identity service.
//!
//! Seeded with one account per role:
//!
//! | Email | Password | Role |
//! |---|---|---|
//! | `admin@rental.com` | `admin123` | admin |
//! | `staff@rental.com` | `staff123` | staff |
//! | `customer@rental.com` | `customer123` | customer |
//!
//! Tokens have the form `mock-token.<user id>.<uuid>` and are resolved back
//! to the account by id, so a token remains usable after the process that
//! issued it exits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rental_desk_core::{
    ContactInfo, Email, ProfileUpdate, Registration, Role, SessionToken, User, UserId, UserStatus,
};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use super::{AuthGrant, IdentityError, IdentityService};

const TOKEN_PREFIX: &str = "mock-token";

struct Account {
    password: SecretString,
    user: User,
}

/// Identity backend backed by an in-memory account directory.
pub struct MockIdentityService {
    accounts: Mutex<HashMap<Email, Account>>,
    reset_tokens: Mutex<HashMap<String, Email>>,
    next_id: AtomicI64,
    latency: Duration,
    available: AtomicBool,
    calls: AtomicUsize,
}

impl std::fmt::Debug for MockIdentityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockIdentityService")
            .field("latency", &self.latency)
            .field("available", &self.available.load(Ordering::SeqCst))
            .field("calls", &self.calls.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Default for MockIdentityService {
    fn default() -> Self {
        Self::seeded()
    }
}

impl MockIdentityService {
    /// Create a service with no accounts.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            accounts: Mutex::default(),
            reset_tokens: Mutex::default(),
            next_id: AtomicI64::new(1),
            latency: Duration::ZERO,
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a service with the demo admin, staff, and customer accounts.
    #[must_use]
    pub fn seeded() -> Self {
        let service = Self::empty();
        for (email, password, first_name, role) in [
            ("admin@rental.com", "admin123", "Avery", Role::Admin),
            ("staff@rental.com", "staff123", "Sam", Role::Staff),
            ("customer@rental.com", "customer123", "Casey", Role::Customer),
        ] {
            if let Ok(email) = Email::parse(email) {
                service.insert_account(&email, password, first_name, "Demo", role, "555-0100");
            }
        }
        service
    }

    /// Delay every call by `latency` before answering.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Simulate an outage: while unavailable every call fails with
    /// [`IdentityError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The outstanding reset token for `email`, standing in for the link a
    /// real backend would email out.
    #[must_use]
    pub fn pending_reset_token(&self, email: &Email) -> Option<String> {
        let tokens = self.reset_tokens.lock().ok()?;
        tokens
            .iter()
            .find(|(_, owner)| *owner == email)
            .map(|(token, _)| token.clone())
    }

    fn insert_account(
        &self,
        email: &Email,
        password: &str,
        first_name: &str,
        last_name: &str,
        role: Role,
        phone: &str,
    ) -> Option<User> {
        let now = Utc::now();
        let user = User {
            id: UserId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
            email: email.clone(),
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            role,
            status: UserStatus::Active,
            contact_info: ContactInfo {
                email: email.clone(),
                phone: phone.to_owned(),
            },
            email_verified: true,
            company_name: None,
            created_at: now,
            updated_at: now,
        };
        let mut accounts = self.accounts.lock().ok()?;
        accounts.insert(
            email.clone(),
            Account {
                password: SecretString::from(password.to_owned()),
                user: user.clone(),
            },
        );
        Some(user)
    }

    /// Count the call, wait out the configured latency, and fail if the
    /// service is switched off.
    async fn enter(&self) -> Result<(), IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(IdentityError::Unavailable(
                "identity service is not responding".to_owned(),
            ))
        }
    }

    fn accounts(&self) -> Result<MutexGuard<'_, HashMap<Email, Account>>, IdentityError> {
        self.accounts
            .lock()
            .map_err(|_| IdentityError::Unavailable("account directory unavailable".to_owned()))
    }

    fn reset_tokens(&self) -> Result<MutexGuard<'_, HashMap<String, Email>>, IdentityError> {
        self.reset_tokens
            .lock()
            .map_err(|_| IdentityError::Unavailable("reset directory unavailable".to_owned()))
    }

    fn issue_token(user: &User) -> SessionToken {
        SessionToken::new(format!("{TOKEN_PREFIX}.{}.{}", user.id, Uuid::new_v4()))
    }

    fn user_id_from_token(token: &SessionToken) -> Option<UserId> {
        let mut parts = token.expose().split('.');
        if parts.next()? != TOKEN_PREFIX {
            return None;
        }
        let id = parts.next()?.parse::<i64>().ok()?;
        parts.next()?;
        Some(UserId::new(id))
    }

    fn account_for_token<'a>(
        accounts: &'a mut HashMap<Email, Account>,
        token: &SessionToken,
    ) -> Result<&'a mut Account, IdentityError> {
        let id = Self::user_id_from_token(token).ok_or(IdentityError::SessionExpired)?;
        accounts
            .values_mut()
            .find(|account| account.user.id == id)
            .ok_or(IdentityError::SessionExpired)
    }
}

impl IdentityService for MockIdentityService {
    async fn authenticate(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthGrant, IdentityError> {
        self.enter().await?;

        let accounts = self.accounts()?;
        let account = accounts
            .get(email)
            .filter(|account| account.password.expose_secret() == password.expose_secret())
            .ok_or(IdentityError::InvalidCredentials)?;

        if account.user.status == UserStatus::Suspended {
            return Err(IdentityError::Rejected(
                "This account has been suspended".to_owned(),
            ));
        }

        Ok(AuthGrant {
            token: Self::issue_token(&account.user),
            user: account.user.clone(),
        })
    }

    async fn register(&self, registration: &Registration) -> Result<AuthGrant, IdentityError> {
        self.enter().await?;

        if !registration.accept_terms {
            return Err(IdentityError::Rejected(
                "You must accept the terms and conditions".to_owned(),
            ));
        }
        if registration.role == Role::Unrecognized {
            return Err(IdentityError::Rejected("Unsupported account role".to_owned()));
        }
        let email = Email::parse(&registration.email)
            .map_err(|e| IdentityError::Rejected(format!("Invalid email: {e}")))?;

        if self.accounts()?.contains_key(&email) {
            return Err(IdentityError::AlreadyRegistered);
        }

        let mut user = self
            .insert_account(
                &email,
                registration.password.expose_secret(),
                &registration.first_name,
                &registration.last_name,
                registration.role,
                &registration.phone,
            )
            .ok_or_else(|| IdentityError::Unavailable("account directory unavailable".to_owned()))?;

        // New accounts start unverified.
        user.company_name.clone_from(&registration.company_name);
        user.email_verified = false;
        if let Some(account) = self.accounts()?.get_mut(&email) {
            account.user = user.clone();
        }

        Ok(AuthGrant {
            token: Self::issue_token(&user),
            user,
        })
    }

    async fn request_password_reset(&self, email: &Email) -> Result<(), IdentityError> {
        self.enter().await?;

        // Unknown addresses succeed too, so the response does not reveal
        // which emails have accounts.
        if self.accounts()?.contains_key(email) {
            let token = format!("reset-{}", Uuid::new_v4());
            self.reset_tokens()?.insert(token, email.clone());
            tracing::info!(email = %email, "Password reset link issued");
        }
        Ok(())
    }

    async fn complete_password_reset(
        &self,
        reset_token: &str,
        new_password: &SecretString,
    ) -> Result<(), IdentityError> {
        self.enter().await?;

        let email = self
            .reset_tokens()?
            .remove(reset_token)
            .ok_or(IdentityError::InvalidResetToken)?;

        let mut accounts = self.accounts()?;
        let account = accounts
            .get_mut(&email)
            .ok_or(IdentityError::InvalidResetToken)?;
        account.password = SecretString::from(new_password.expose_secret().to_owned());
        account.user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_profile(
        &self,
        token: &SessionToken,
        update: &ProfileUpdate,
    ) -> Result<User, IdentityError> {
        self.enter().await?;

        let mut accounts = self.accounts()?;
        let account = Self::account_for_token(&mut accounts, token)?;
        account.user = update.apply(&account.user, Utc::now());
        Ok(account.user.clone())
    }

    async fn current_user(&self, token: &SessionToken) -> Result<User, IdentityError> {
        self.enter().await?;

        let mut accounts = self.accounts()?;
        let account = Self::account_for_token(&mut accounts, token)?;
        Ok(account.user.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_owned())
    }

    fn registration(address: &str) -> Registration {
        Registration {
            email: address.to_owned(),
            password: secret("hunter22"),
            first_name: "Riley".to_owned(),
            last_name: "New".to_owned(),
            phone: "555-0142".to_owned(),
            role: Role::Customer,
            company_name: Some("Riley Tools".to_owned()),
            accept_terms: true,
        }
    }

    #[tokio::test]
    async fn test_seeded_accounts_authenticate() {
        let service = MockIdentityService::seeded();

        let grant = service
            .authenticate(&email("admin@rental.com"), &secret("admin123"))
            .await
            .unwrap();

        assert_eq!(grant.user.role, Role::Admin);
        assert!(grant.token.expose().starts_with("mock-token."));
        assert_eq!(service.call_count(), 1);
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let service = MockIdentityService::seeded();

        let err = service
            .authenticate(&email("admin@rental.com"), &secret("nope"))
            .await
            .unwrap_err();

        assert_eq!(err, IdentityError::InvalidCredentials);
        assert_eq!(err.to_string(), "Invalid email or password");
    }

    #[tokio::test]
    async fn test_register_then_duplicate() {
        let service = MockIdentityService::seeded();

        let grant = service.register(&registration("riley@tools.com")).await.unwrap();
        assert_eq!(grant.user.company_name.as_deref(), Some("Riley Tools"));
        assert_eq!(grant.user.contact_info.phone, "555-0142");

        let err = service
            .register(&registration("Riley@Tools.com"))
            .await
            .unwrap_err();
        assert_eq!(err, IdentityError::AlreadyRegistered);
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let service = MockIdentityService::seeded();
        let staff = email("staff@rental.com");

        service.request_password_reset(&staff).await.unwrap();
        let token = service.pending_reset_token(&staff).unwrap();
        service
            .complete_password_reset(&token, &secret("new-pass-1"))
            .await
            .unwrap();

        assert!(service.authenticate(&staff, &secret("staff123")).await.is_err());
        assert!(service.authenticate(&staff, &secret("new-pass-1")).await.is_ok());

        let reused = service
            .complete_password_reset(&token, &secret("again-1234"))
            .await
            .unwrap_err();
        assert_eq!(reused, IdentityError::InvalidResetToken);
    }

    #[tokio::test]
    async fn test_reset_for_unknown_email_succeeds_silently() {
        let service = MockIdentityService::seeded();
        let nobody = email("nobody@rental.com");

        service.request_password_reset(&nobody).await.unwrap();
        assert!(service.pending_reset_token(&nobody).is_none());
    }

    #[tokio::test]
    async fn test_token_resolves_to_user() {
        let service = MockIdentityService::seeded();
        let grant = service
            .authenticate(&email("customer@rental.com"), &secret("customer123"))
            .await
            .unwrap();

        let user = service.current_user(&grant.token).await.unwrap();
        assert_eq!(user.id, grant.user.id);

        let updated = service
            .update_profile(&grant.token, &ProfileUpdate::phone("555-0100"))
            .await
            .unwrap();
        assert_eq!(updated.contact_info.phone, "555-0100");

        let bogus = service
            .current_user(&SessionToken::new("forged"))
            .await
            .unwrap_err();
        assert_eq!(bogus, IdentityError::SessionExpired);
    }

    #[tokio::test]
    async fn test_unavailable_service_fails_every_call() {
        let service = MockIdentityService::seeded();
        service.set_available(false);

        let err = service
            .authenticate(&email("admin@rental.com"), &secret("admin123"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Unavailable(_)));

        service.set_available(true);
        assert!(
            service
                .authenticate(&email("admin@rental.com"), &secret("admin123"))
                .await
                .is_ok()
        );
    }
}
