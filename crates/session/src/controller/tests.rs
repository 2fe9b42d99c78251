use rental_desk_core::Role;

use super::*;
use crate::identity::MockIdentityService;
use crate::store::{MemoryStore, test_support};

type Controller = SessionController<MockIdentityService, MemoryStore>;

fn controller() -> Controller {
    SessionController::new(
        MockIdentityService::seeded(),
        MemoryStore::new(),
        SessionConfig::default(),
    )
}

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_owned())
}

fn registration(email: &str, password: &str, accept_terms: bool) -> Registration {
    Registration {
        email: email.to_owned(),
        password: secret(password),
        first_name: "Jordan".to_owned(),
        last_name: "Lee".to_owned(),
        phone: "555-0123".to_owned(),
        role: Role::Customer,
        company_name: None,
        accept_terms,
    }
}

fn stored_scopes(store: &MemoryStore) -> Vec<StorageScope> {
    StorageScope::LOOKUP_ORDER
        .into_iter()
        .filter(|scope| !store.is_scope_empty(*scope).unwrap())
        .collect()
}

#[tokio::test]
async fn test_login_remembered_goes_to_durable_scope() {
    let controller = controller();

    let outcome = controller
        .login("admin@rental.com", &secret("admin123"), true)
        .await;

    assert!(outcome.is_committed());
    let state = controller.snapshot();
    assert!(state.is_authenticated());
    assert_eq!(state.user().unwrap().role, Role::Admin);
    assert_eq!(
        state.session().unwrap().scope,
        Some(StorageScope::Durable)
    );
    assert_eq!(stored_scopes(controller.store()), [StorageScope::Durable]);
    assert_eq!(
        controller.store().get_token().unwrap().as_ref(),
        state.token()
    );
}

#[tokio::test]
async fn test_login_not_remembered_goes_to_ephemeral_scope() {
    let controller = controller();

    let outcome = controller
        .login("staff@rental.com", &secret("staff123"), false)
        .await;

    assert!(outcome.is_committed());
    assert_eq!(stored_scopes(controller.store()), [StorageScope::Ephemeral]);
    assert_eq!(
        controller.store().user_in(StorageScope::Ephemeral).unwrap(),
        controller.snapshot().user().cloned()
    );
}

#[tokio::test]
async fn test_rejected_login_fails_and_leaves_storage_alone() {
    let controller = controller();

    let outcome = controller.login("x@x.com", &secret("wrong"), false).await;

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.message, "Invalid email or password");
    assert_eq!(failure.kind, FailureKind::Credentials);

    let state = controller.snapshot();
    assert_eq!(state.status(), AuthStatus::Failed);
    assert_eq!(state.error(), Some(failure));
    assert!(state.user().is_none());
    assert!(stored_scopes(controller.store()).is_empty());
}

#[tokio::test]
async fn test_invalid_email_fails_without_a_call() {
    let controller = controller();

    let outcome = controller.login("not-an-email", &secret("x"), false).await;

    assert_eq!(
        outcome.failure().unwrap().message,
        "Please enter a valid email address"
    );
    assert_eq!(outcome.failure().unwrap().kind, FailureKind::Validation);
    assert_eq!(controller.identity().call_count(), 0);
}

#[tokio::test]
async fn test_failed_login_drops_existing_session_and_its_storage() {
    let controller = controller();
    assert!(
        controller
            .login("customer@rental.com", &secret("customer123"), true)
            .await
            .is_committed()
    );

    let outcome = controller
        .login("customer@rental.com", &secret("nope"), true)
        .await;

    assert!(outcome.failure().is_some());
    assert!(controller.snapshot().session().is_none());
    assert!(stored_scopes(controller.store()).is_empty());
}

#[tokio::test]
async fn test_logout_empties_state_and_storage() {
    let controller = controller();
    assert!(
        controller
            .login("admin@rental.com", &secret("admin123"), true)
            .await
            .is_committed()
    );

    controller.logout();

    assert_eq!(controller.snapshot(), AuthState::default());
    assert!(stored_scopes(controller.store()).is_empty());

    // Logging out again is harmless.
    controller.logout();
    assert_eq!(controller.snapshot(), AuthState::default());
}

#[test]
fn test_init_hydrates_without_identity_call() {
    let store = MemoryStore::new();
    let user = test_support::customer();
    store.set_user(&user, StorageScope::Durable).unwrap();
    store
        .set_token(&SessionToken::new("mock-token.3.abc"), StorageScope::Durable)
        .unwrap();
    let controller =
        SessionController::new(MockIdentityService::seeded(), store, SessionConfig::default());

    let hydration = controller.init();

    assert_eq!(hydration, Hydration::Restored(StorageScope::Durable));
    let state = controller.snapshot();
    assert!(state.is_authenticated());
    assert_eq!(state.user(), Some(&user));
    assert_eq!(state.token().unwrap().expose(), "mock-token.3.abc");
    assert_eq!(controller.identity().call_count(), 0);
}

#[test]
fn test_init_discards_torn_record() {
    let store = MemoryStore::new();
    store
        .set_user(&test_support::customer(), StorageScope::Durable)
        .unwrap();
    let controller =
        SessionController::new(MockIdentityService::seeded(), store, SessionConfig::default());

    assert_eq!(controller.init(), Hydration::Discarded);
    assert_eq!(controller.snapshot(), AuthState::default());
    assert!(stored_scopes(controller.store()).is_empty());
}

#[test]
fn test_init_discards_record_split_across_scopes() {
    let store = MemoryStore::new();
    store
        .set_token(&SessionToken::new("tok"), StorageScope::Durable)
        .unwrap();
    store
        .set_user(&test_support::customer(), StorageScope::Ephemeral)
        .unwrap();
    let controller =
        SessionController::new(MockIdentityService::seeded(), store, SessionConfig::default());

    assert_eq!(controller.init(), Hydration::Discarded);
    assert!(stored_scopes(controller.store()).is_empty());
}

#[test]
fn test_init_with_empty_storage() {
    let controller = controller();
    assert_eq!(controller.init(), Hydration::Empty);
    assert_eq!(controller.snapshot(), AuthState::default());
}

#[tokio::test]
async fn test_clear_error_only_affects_failed_state() {
    let controller = controller();
    let _ = controller.login("x@x.com", &secret("wrong"), false).await;

    controller.clear_error();
    assert_eq!(controller.snapshot(), AuthState::default());

    assert!(
        controller
            .login("admin@rental.com", &secret("admin123"), false)
            .await
            .is_committed()
    );
    let before = controller.snapshot();
    controller.clear_error();
    assert_eq!(controller.snapshot(), before);
}

#[tokio::test]
async fn test_update_profile_rewrites_remembered_scope() {
    let controller = controller();
    assert!(
        controller
            .login("customer@rental.com", &secret("customer123"), true)
            .await
            .is_committed()
    );
    let token = controller.snapshot().token().cloned();

    let outcome = controller
        .update_profile(ProfileUpdate::phone("555-0100"))
        .await;

    assert!(outcome.is_committed());
    let state = controller.snapshot();
    assert!(state.is_authenticated());
    assert_eq!(state.user().unwrap().contact_info.phone, "555-0100");
    assert_eq!(state.token().cloned(), token);

    let durable = controller
        .store()
        .user_in(StorageScope::Durable)
        .unwrap()
        .unwrap();
    assert_eq!(durable.contact_info.phone, "555-0100");
    assert!(controller.store().is_scope_empty(StorageScope::Ephemeral).unwrap());
}

#[tokio::test]
async fn test_update_profile_requires_session() {
    let controller = controller();

    let outcome = controller
        .update_profile(ProfileUpdate::phone("555-0100"))
        .await;

    assert_eq!(
        outcome.failure().unwrap().kind,
        FailureKind::Unauthenticated
    );
    assert_eq!(controller.snapshot().status(), AuthStatus::Failed);
    assert_eq!(controller.identity().call_count(), 0);
}

#[tokio::test]
async fn test_register_validates_before_calling() {
    let controller = controller();

    let cases = [
        (
            registration("bad", "longenough", true),
            "Please enter a valid email address",
        ),
        (
            registration("jordan@lee.com", "longenough", false),
            "You must accept the terms and conditions",
        ),
        (
            registration("jordan@lee.com", "short", true),
            "Password must be at least 8 characters",
        ),
    ];
    for (form, message) in cases {
        let outcome = controller.register(form).await;
        assert_eq!(outcome.failure().unwrap().message, message);
    }
    assert_eq!(controller.identity().call_count(), 0);
}

#[tokio::test]
async fn test_register_signs_in_durably() {
    let controller = controller();

    let outcome = controller
        .register(registration("jordan@lee.com", "longenough", true))
        .await;

    assert!(outcome.is_committed());
    let state = controller.snapshot();
    assert_eq!(state.user().unwrap().email.as_str(), "jordan@lee.com");
    assert_eq!(stored_scopes(controller.store()), [StorageScope::Durable]);

    let duplicate = controller
        .register(registration("jordan@lee.com", "longenough", true))
        .await;
    assert_eq!(
        duplicate.failure().unwrap().message,
        "An account with this email already exists"
    );
}

#[tokio::test]
async fn test_password_recovery_leaves_session_unchanged() {
    let controller = controller();
    let email = Email::parse("staff@rental.com").unwrap();

    assert!(controller.forgot_password(email.as_str()).await.is_committed());
    assert_eq!(controller.snapshot(), AuthState::default());

    let reset_token = controller.identity().pending_reset_token(&email).unwrap();
    assert!(
        controller
            .reset_password(&reset_token, &secret("brand-new-pass"))
            .await
            .is_committed()
    );
    assert_eq!(controller.snapshot(), AuthState::default());

    assert!(
        controller
            .login(email.as_str(), &secret("brand-new-pass"), false)
            .await
            .is_committed()
    );
    assert!(controller.forgot_password(email.as_str()).await.is_committed());
    assert!(controller.snapshot().is_authenticated());
}

#[tokio::test]
async fn test_reset_password_rejects_bad_input() {
    let controller = controller();

    let blank = controller.reset_password("  ", &secret("long-enough")).await;
    assert_eq!(blank.failure().unwrap().message, "Reset token is required");

    let short = controller.reset_password("reset-1", &secret("short")).await;
    assert_eq!(
        short.failure().unwrap().message,
        "Password must be at least 8 characters"
    );

    let unknown = controller
        .reset_password("reset-unknown", &secret("long-enough"))
        .await;
    assert_eq!(
        unknown.failure().unwrap().message,
        "Invalid or expired reset token"
    );
    assert_eq!(controller.identity().call_count(), 1);
}

#[tokio::test]
async fn test_verify_session_refreshes_user() {
    let controller = controller();
    assert!(
        controller
            .login("customer@rental.com", &secret("customer123"), false)
            .await
            .is_committed()
    );

    assert!(controller.verify_session().await.is_committed());
    assert!(controller.snapshot().is_authenticated());
    assert_eq!(
        controller.snapshot().session().unwrap().scope,
        Some(StorageScope::Ephemeral)
    );
}

#[tokio::test]
async fn test_verify_session_rejected_token_signs_out() {
    let store = MemoryStore::new();
    store
        .set_user(&test_support::customer(), StorageScope::Durable)
        .unwrap();
    store
        .set_token(&SessionToken::new("forged"), StorageScope::Durable)
        .unwrap();
    let config = SessionConfig {
        verify_on_hydrate: true,
        ..SessionConfig::default()
    };
    let controller = SessionController::new(MockIdentityService::seeded(), store, config);

    assert_eq!(controller.init_verified().await, Hydration::Discarded);
    assert_eq!(controller.snapshot(), AuthState::default());
    assert!(stored_scopes(controller.store()).is_empty());
}

#[tokio::test]
async fn test_verify_session_keeps_session_when_service_is_down() {
    let controller = controller();
    assert!(
        controller
            .login("admin@rental.com", &secret("admin123"), true)
            .await
            .is_committed()
    );
    controller.identity().set_available(false);

    let outcome = controller.verify_session().await;

    assert_eq!(outcome.failure().unwrap().kind, FailureKind::Service);
    assert!(controller.snapshot().is_authenticated());
    assert_eq!(stored_scopes(controller.store()), [StorageScope::Durable]);
}

#[tokio::test]
async fn test_storage_failure_degrades_to_memory_only() {
    let controller = SessionController::new(
        MockIdentityService::seeded(),
        MemoryStore::with_quota(16),
        SessionConfig::default(),
    );

    let outcome = controller
        .login("admin@rental.com", &secret("admin123"), true)
        .await;

    assert!(outcome.is_committed());
    let state = controller.snapshot();
    assert!(state.is_authenticated());
    assert_eq!(state.session().unwrap().scope, None);
    assert!(stored_scopes(controller.store()).is_empty());

    // Profile edits stay in memory too.
    assert!(
        controller
            .update_profile(ProfileUpdate::phone("555-0100"))
            .await
            .is_committed()
    );
    assert!(stored_scopes(controller.store()).is_empty());
}

#[tokio::test]
async fn test_subscribers_see_changes_until_shutdown() {
    let controller = controller();
    let mut states = controller.subscribe();

    assert!(
        controller
            .login("staff@rental.com", &secret("staff123"), false)
            .await
            .is_committed()
    );
    states.changed().await.unwrap();
    assert!(states.borrow_and_update().is_authenticated());

    controller.shutdown();
    assert!(states.changed().await.is_err());
}
