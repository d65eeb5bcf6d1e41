use std::sync::Arc;

use async_trait::async_trait;
use chirpy_auth::auth::{AccessTokenCodec, AuthService, PasswordHasher, RefreshTokenService};
use chirpy_auth::error::{AuthError, DatabaseError};
use chirpy_auth::store::{
    Credential, InMemoryRefreshTokenStore, InMemoryUserLookup, UserLookup,
};
use chrono::{Duration, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const SECRET: &[u8] = b"integration-test-secret-0123456789";
const TEST_COST: u32 = 4;

pub struct TestAuth {
    pub service: AuthService,
    pub user_id: Uuid,
    pub tokens: Arc<InMemoryRefreshTokenStore>,
}

fn codec() -> AccessTokenCodec {
    AccessTokenCodec::new(SECRET, "Chirpy", Duration::hours(1))
}

fn build(refresh_ttl: Duration) -> TestAuth {
    let hasher = PasswordHasher::new(TEST_COST);
    let user_id = Uuid::new_v4();

    let users = Arc::new(InMemoryUserLookup::new());
    users.insert(
        "a@b.com",
        Credential {
            user_id,
            password_hash: hasher.hash("correct-pw").expect("Failed to hash password"),
        },
    );
    users.insert(
        "broken@b.com",
        Credential {
            user_id: Uuid::new_v4(),
            password_hash: "not-a-bcrypt-hash".to_string(),
        },
    );

    let tokens = Arc::new(InMemoryRefreshTokenStore::new());
    let service = AuthService::new(
        users,
        hasher,
        codec(),
        RefreshTokenService::new(tokens.clone(), refresh_ttl),
    )
    .expect("Failed to build auth service");

    TestAuth {
        service,
        user_id,
        tokens,
    }
}

#[tokio::test]
async fn login_then_refresh_returns_token_for_same_user() {
    let app = build(Duration::days(60));
    let cancel = CancellationToken::new();

    let session = app
        .service
        .login("a@b.com", "correct-pw", &cancel)
        .await
        .expect("Login failed");

    assert_eq!(session.user_id, app.user_id);
    assert!(!session.access_token.is_empty());
    assert_eq!(codec().validate(&session.access_token).unwrap(), app.user_id);

    let expected_expiry = Utc::now() + Duration::days(60);
    let drift = (session.refresh_token.expires_at - expected_expiry).num_seconds().abs();
    assert!(drift < 5, "refresh token expiry off by {}s", drift);

    let refreshed = app
        .service
        .refresh(&session.refresh_token.token, &cancel)
        .await
        .expect("Refresh failed");
    assert_eq!(app.service.authenticate(&refreshed).unwrap(), app.user_id);

    // No rotation: the same refresh token keeps working
    assert!(app
        .service
        .refresh(&session.refresh_token.token, &cancel)
        .await
        .is_ok());
    assert_eq!(app.tokens.len(), 1);
}

#[tokio::test]
async fn wrong_password_and_unknown_email_are_indistinguishable() {
    let app = build(Duration::days(60));
    let cancel = CancellationToken::new();

    let wrong_password = app.service.login("a@b.com", "wrong-pw", &cancel).await;
    let unknown_email = app.service.login("nobody@b.com", "correct-pw", &cancel).await;
    let broken_hash = app.service.login("broken@b.com", "correct-pw", &cancel).await;

    assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
    assert!(matches!(unknown_email, Err(AuthError::InvalidCredentials)));
    assert!(matches!(broken_hash, Err(AuthError::InvalidCredentials)));
    assert!(app.tokens.is_empty());
}

#[tokio::test]
async fn revoked_refresh_token_is_unauthorized() {
    let app = build(Duration::days(60));
    let cancel = CancellationToken::new();

    let session = app.service.login("a@b.com", "correct-pw", &cancel).await.unwrap();
    let token = session.refresh_token.token;

    app.service.revoke(&token, &cancel).await.unwrap();
    // Second revoke is fine
    app.service.revoke(&token, &cancel).await.unwrap();

    let result = app.service.refresh(&token, &cancel).await;
    assert!(matches!(result, Err(AuthError::Unauthorized)));
}

#[tokio::test]
async fn unknown_and_expired_refresh_tokens_are_unauthorized() {
    let app = build(Duration::seconds(-1));
    let cancel = CancellationToken::new();

    let session = app.service.login("a@b.com", "correct-pw", &cancel).await.unwrap();

    assert!(matches!(
        app.service.refresh(&session.refresh_token.token, &cancel).await,
        Err(AuthError::Unauthorized)
    ));
    assert!(matches!(
        app.service.refresh("0123abcd", &cancel).await,
        Err(AuthError::Unauthorized)
    ));
}

struct StalledUserLookup;

#[async_trait]
impl UserLookup for StalledUserLookup {
    async fn find_by_email(&self, _email: &str) -> Result<Option<Credential>, DatabaseError> {
        futures::future::pending().await
    }
}

struct FailingUserLookup;

#[async_trait]
impl UserLookup for FailingUserLookup {
    async fn find_by_email(&self, _email: &str) -> Result<Option<Credential>, DatabaseError> {
        Err(DatabaseError::ConnectionPool("connection refused".to_string()))
    }
}

fn service_with(users: Arc<dyn UserLookup>) -> AuthService {
    AuthService::new(
        users,
        PasswordHasher::new(TEST_COST),
        codec(),
        RefreshTokenService::new(Arc::new(InMemoryRefreshTokenStore::new()), Duration::days(60)),
    )
    .unwrap()
}

#[tokio::test]
async fn cancellation_aborts_pending_lookup() {
    let service = service_with(Arc::new(StalledUserLookup));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = service.login("a@b.com", "correct-pw", &cancel).await;
    assert!(matches!(result, Err(AuthError::Cancelled)));
}

#[tokio::test]
async fn storage_failure_is_not_reported_as_bad_credentials() {
    let service = service_with(Arc::new(FailingUserLookup));

    let result = service
        .login("a@b.com", "correct-pw", &CancellationToken::new())
        .await;

    match result {
        Err(e @ AuthError::Storage(_)) => assert!(e.is_infrastructure()),
        other => panic!("Expected storage failure, got {:?}", other.map(|s| s.user_id)),
    }
}
