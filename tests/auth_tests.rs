mod common;

use chrono::{Duration, Utc};
use labtrack::db::SessionRecord;
use labtrack::domain::Role;
use labtrack::services::AuthError;

use common::{PASSWORD, seed_user, test_state, test_state_with};

#[tokio::test]
async fn register_then_login() {
    let state = test_state().await;

    let user = state
        .auth
        .register("Alice", " Alice@Example.com ", PASSWORD)
        .await
        .unwrap();
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.role, Role::User);

    let session = state
        .auth
        .login("ALICE@example.com", PASSWORD, Some("192.0.2.10"))
        .await
        .unwrap();
    assert_eq!(session.user.email, user.email);
    assert!(session.expires_at > Utc::now());

    let authenticated = state.auth.authenticate(&session.token).await.unwrap();
    assert_eq!(authenticated.map(|u| u.email), Some(user.email));

    let stored = state
        .store
        .find_session_by_identity("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.client_ip.as_deref(), Some("192.0.2.10"));
}

#[tokio::test]
async fn registration_rejects_bad_input() {
    let state = test_state().await;
    seed_user(&state, "Alice", Role::User).await;

    let err = state
        .auth
        .register("Other Alice", "alice@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Conflict(_)), "{err:?}");

    let err = state
        .auth
        .register("Bob", "bob@example.com", "abc")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)), "{err:?}");

    let err = state
        .auth
        .register("  ", "carol@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)), "{err:?}");

    let err = state
        .auth
        .register("Dave", "not-an-email", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)), "{err:?}");

    assert_eq!(state.auth.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn wrong_credentials_are_rejected() {
    let state = test_state().await;
    seed_user(&state, "Alice", Role::User).await;

    let err = state
        .auth
        .login("alice@example.com", "wrong-password", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials), "{err:?}");

    let err = state
        .auth
        .login("ghost@example.com", PASSWORD, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials), "{err:?}");
}

#[tokio::test]
async fn new_login_replaces_previous_session() {
    let state = test_state().await;
    seed_user(&state, "Alice", Role::User).await;

    let first = state
        .auth
        .login("alice@example.com", PASSWORD, None)
        .await
        .unwrap();
    let second = state
        .auth
        .login("alice@example.com", PASSWORD, None)
        .await
        .unwrap();
    assert_ne!(first.token, second.token);

    assert!(state.auth.authenticate(&first.token).await.unwrap().is_none());
    assert!(state.auth.authenticate(&second.token).await.unwrap().is_some());
}

#[tokio::test]
async fn expired_sessions_do_not_authenticate() {
    let state = test_state().await;
    seed_user(&state, "Alice", Role::User).await;

    let now = Utc::now();
    state
        .store
        .upsert_session(&SessionRecord {
            identity: "alice@example.com".to_string(),
            token: "stale-token".to_string(),
            client_ip: None,
            created_at: now - Duration::days(30),
            expires_at: now - Duration::days(23),
        })
        .await
        .unwrap();

    assert!(state.auth.authenticate("stale-token").await.unwrap().is_none());
    assert!(state.auth.authenticate("").await.unwrap().is_none());
    assert!(state.auth.authenticate("unknown").await.unwrap().is_none());

    assert_eq!(state.store.prune_expired_sessions(now).await.unwrap(), 1);
}

#[tokio::test]
async fn revoke_is_idempotent() {
    let state = test_state().await;
    seed_user(&state, "Alice", Role::User).await;

    let session = state
        .auth
        .login("alice@example.com", PASSWORD, None)
        .await
        .unwrap();

    state.auth.revoke(&session.token).await.unwrap();
    state.auth.revoke(&session.token).await.unwrap();
    assert!(state.auth.authenticate(&session.token).await.unwrap().is_none());
}

#[tokio::test]
async fn only_managers_promote() {
    let state = test_state().await;
    let alice = seed_user(&state, "Alice", Role::User).await;
    let assigner = seed_user(&state, "Ann", Role::Assigner).await;
    let manager = seed_user(&state, "Maria", Role::Manager).await;

    let err = state
        .auth
        .promote(&assigner, &alice.email, "manager")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden(_)), "{err:?}");
    let unchanged = state.store.get_user_by_email(&alice.email).await.unwrap();
    assert_eq!(unchanged.map(|u| u.role), Some(Role::User));

    let err = state
        .auth
        .promote(&manager, &alice.email, "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)), "{err:?}");

    let err = state
        .auth
        .promote(&manager, &alice.email, "user")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)), "{err:?}");

    let err = state
        .auth
        .promote(&manager, "ghost@example.com", "assigner")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NotFound(_)), "{err:?}");

    let promoted = state
        .auth
        .promote(&manager, "ALICE@example.com", "Assigner")
        .await
        .unwrap();
    assert_eq!(promoted.role, Role::Assigner);

    let assigners = state
        .auth
        .list_users_by_role(&[Role::Assigner])
        .await
        .unwrap();
    let emails: Vec<_> = assigners.iter().map(|u| u.email.as_str()).collect();
    assert_eq!(emails.len(), 2);
    assert!(emails.contains(&"alice@example.com"));
    assert!(emails.contains(&"ann@example.com"));
}

#[tokio::test]
async fn login_matches_registration_for_non_ascii_emails() {
    let state = test_state().await;

    let user = state
        .auth
        .register("Ulla", "Ülla@Example.com", PASSWORD)
        .await
        .unwrap();
    assert_eq!(user.email, "Ülla@example.com");

    let session = state
        .auth
        .login("Ülla@example.com", PASSWORD, None)
        .await
        .unwrap();
    assert_eq!(session.user.email, user.email);

    let session = state
        .auth
        .login(" Ülla@EXAMPLE.com ", PASSWORD, None)
        .await
        .unwrap();
    assert_eq!(session.user.email, user.email);

    let err = state
        .auth
        .login("not-an-email", PASSWORD, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials), "{err:?}");
}

#[tokio::test]
async fn out_of_range_session_ttl_fails_login_without_panicking() {
    let state = test_state_with(|config| config.security.session_ttl_days = 200_000_000).await;
    seed_user(&state, "Alice", Role::User).await;

    let err = state
        .auth
        .login("alice@example.com", PASSWORD, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Internal(_)), "{err:?}");
    assert!(
        state
            .store
            .find_session_by_identity("alice@example.com")
            .await
            .unwrap()
            .is_none()
    );
}
