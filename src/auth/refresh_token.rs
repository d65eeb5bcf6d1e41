/// Refresh Token Management
///
/// Refresh tokens are:
/// - 32 random bytes from the OS generator, hex-encoded
/// - Persisted server-side through a `RefreshTokenStore`
/// - Usable while `revoked_at` is unset and `now < expires_at`
/// - Never rotated on use; only an explicit revoke retires them early

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::configuration::AuthSettings;
use crate::error::AuthError;
use crate::store::{with_cancellation, RefreshTokenStore};

const REFRESH_TOKEN_BYTES: usize = 32;

/// A persisted refresh token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Generate a new refresh token value (256 bits, 64 hex characters)
///
/// # Errors
/// `EntropyFailure` if the OS random source is unavailable
pub fn generate_refresh_token() -> Result<String, AuthError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
        tracing::error!("Random source failed: {}", e);
        AuthError::EntropyFailure(e.to_string())
    })?;
    Ok(hex::encode(bytes))
}

/// Issues, validates and revokes refresh tokens against a store
#[derive(Clone)]
pub struct RefreshTokenService {
    store: Arc<dyn RefreshTokenStore>,
    ttl: Duration,
}

impl RefreshTokenService {
    pub fn new(store: Arc<dyn RefreshTokenStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn from_settings(store: Arc<dyn RefreshTokenStore>, settings: &AuthSettings) -> Self {
        Self::new(store, settings.refresh_token_ttl())
    }

    /// Create and persist a fresh token for `user_id`
    ///
    /// # Errors
    /// `EntropyFailure`, `ConflictError` on a duplicate value, `Storage`, `Cancelled`
    pub async fn issue(
        &self,
        user_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<RefreshToken, AuthError> {
        let now = Utc::now();
        let record = RefreshToken {
            token: generate_refresh_token()?,
            user_id,
            created_at: now,
            expires_at: now + self.ttl,
            revoked_at: None,
        };

        let record = with_cancellation(cancel, self.store.insert(record)).await?;
        tracing::debug!(user_id = %user_id, expires_at = %record.expires_at, "Refresh token issued");
        Ok(record)
    }

    /// Check a token and return the user that owns it. Does not modify the token.
    ///
    /// # Errors
    /// `NotFound`, `Revoked`, `Expired`, plus `Storage` / `Cancelled`
    pub async fn validate(
        &self,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<Uuid, AuthError> {
        let record = with_cancellation(cancel, self.store.find_by_token(token))
            .await?
            .ok_or(AuthError::NotFound)?;

        if record.is_revoked() {
            return Err(AuthError::Revoked);
        }
        if record.is_expired_at(Utc::now()) {
            return Err(AuthError::Expired);
        }

        Ok(record.user_id)
    }

    /// Revoke a token. Revoking twice, or revoking an unknown token, succeeds.
    pub async fn revoke(&self, token: &str, cancel: &CancellationToken) -> Result<(), AuthError> {
        with_cancellation(cancel, self.store.mark_revoked(token, Utc::now())).await
    }
}
