use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::RefreshToken;
use crate::error::DatabaseError;
use crate::store::{Credential, RefreshTokenStore, UserLookup};

// A panic while holding the lock cannot leave a half-written row behind,
// so a poisoned map is still consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Users keyed by email
#[derive(Default)]
pub struct InMemoryUserLookup {
    users: Mutex<HashMap<String, Credential>>,
}

impl InMemoryUserLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, email: impl Into<String>, credential: Credential) {
        lock(&self.users).insert(email.into(), credential);
    }
}

#[async_trait]
impl UserLookup for InMemoryUserLookup {
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, DatabaseError> {
        Ok(lock(&self.users).get(email).cloned())
    }
}

/// Refresh tokens keyed by their raw value
#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    tokens: Mutex<HashMap<String, RefreshToken>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.tokens).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn insert(&self, record: RefreshToken) -> Result<RefreshToken, DatabaseError> {
        let mut tokens = lock(&self.tokens);
        if tokens.contains_key(&record.token) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "refresh token already exists".to_string(),
            ));
        }
        tokens.insert(record.token.clone(), record.clone());
        Ok(record)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>, DatabaseError> {
        Ok(lock(&self.tokens).get(token).cloned())
    }

    async fn mark_revoked(&self, token: &str, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        if let Some(record) = lock(&self.tokens).get_mut(token) {
            record.revoked_at.get_or_insert(at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn record(token: &str) -> RefreshToken {
        let now = Utc::now();
        RefreshToken {
            token: token.to_string(),
            user_id: Uuid::new_v4(),
            created_at: now,
            expires_at: now + Duration::days(60),
            revoked_at: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let store = InMemoryRefreshTokenStore::new();
        let original = store.insert(record("abc")).await.unwrap();

        let result = store.insert(record("abc")).await;
        assert!(matches!(
            result,
            Err(DatabaseError::UniqueConstraintViolation(_))
        ));

        // Original row untouched
        let found = store.find_by_token("abc").await.unwrap().unwrap();
        assert_eq!(found.user_id, original.user_id);
    }

    #[tokio::test]
    async fn test_mark_revoked_keeps_first_timestamp() {
        let store = InMemoryRefreshTokenStore::new();
        store.insert(record("abc")).await.unwrap();

        let first = Utc::now() - Duration::minutes(5);
        store.mark_revoked("abc", first).await.unwrap();
        store.mark_revoked("abc", Utc::now()).await.unwrap();

        let found = store.find_by_token("abc").await.unwrap().unwrap();
        assert_eq!(found.revoked_at, Some(first));
    }

    #[tokio::test]
    async fn test_mark_revoked_unknown_token() {
        let store = InMemoryRefreshTokenStore::new();
        assert!(store.mark_revoked("missing", Utc::now()).await.is_ok());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_user_lookup() {
        let users = InMemoryUserLookup::new();
        let user_id = Uuid::new_v4();
        users.insert(
            "a@b.com",
            Credential {
                user_id,
                password_hash: "$2b$04$hash".to_string(),
            },
        );

        let found = users.find_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(found.user_id, user_id);
        assert!(users.find_by_email("x@y.com").await.unwrap().is_none());
    }
}
