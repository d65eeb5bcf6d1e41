/// Login, refresh and revoke flows
///
/// `AuthService` is what the request layer talks to. It collapses the
/// reasons a login or refresh can fail into a single client-visible kind and
/// keeps the specific reason in the logs.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::auth::jwt::AccessTokenCodec;
use crate::auth::password::PasswordHasher;
use crate::auth::refresh_token::{generate_refresh_token, RefreshToken, RefreshTokenService};
use crate::configuration::AuthSettings;
use crate::error::AuthError;
use crate::store::{with_cancellation, RefreshTokenStore, UserLookup};

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: RefreshToken,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserLookup>,
    hasher: PasswordHasher,
    access_tokens: AccessTokenCodec,
    refresh_tokens: RefreshTokenService,
    /// Verified against when the email is unknown, so both paths cost one bcrypt run
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserLookup>,
        hasher: PasswordHasher,
        access_tokens: AccessTokenCodec,
        refresh_tokens: RefreshTokenService,
    ) -> Result<Self, AuthError> {
        let dummy_hash = hasher.hash(&generate_refresh_token()?)?;
        Ok(Self {
            users,
            hasher,
            access_tokens,
            refresh_tokens,
            dummy_hash,
        })
    }

    pub fn from_settings(
        users: Arc<dyn UserLookup>,
        tokens: Arc<dyn RefreshTokenStore>,
        settings: &AuthSettings,
    ) -> Result<Self, AuthError> {
        Self::new(
            users,
            PasswordHasher::from_settings(settings),
            AccessTokenCodec::from_settings(settings),
            RefreshTokenService::from_settings(tokens, settings),
        )
    }

    pub fn access_tokens(&self) -> &AccessTokenCodec {
        &self.access_tokens
    }

    /// Verify email and password, then mint an access + refresh token pair
    ///
    /// # Errors
    /// `InvalidCredentials` for an unknown email, a wrong password or an
    /// unreadable stored digest. Infrastructure failures and `Cancelled` pass through.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<LoginSession, AuthError> {
        let credential = with_cancellation(cancel, self.users.find_by_email(email)).await?;

        let (user_id, stored_hash) = match credential {
            Some(credential) => (Some(credential.user_id), credential.password_hash),
            None => (None, self.dummy_hash.clone()),
        };

        let verified = match self.verify_password(password, stored_hash).await {
            Ok(verified) => verified,
            Err(AuthError::HashingFailure(e)) => {
                tracing::error!(user_id = ?user_id, error = %e, "Stored password hash is unusable");
                false
            }
            Err(e) => return Err(e),
        };

        let user_id = match (user_id, verified) {
            (Some(user_id), true) => user_id,
            (None, _) => {
                tracing::info!("Login rejected: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
            (Some(user_id), false) => {
                tracing::info!(user_id = %user_id, "Login rejected: password mismatch");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let access_token = self.access_tokens.issue(user_id)?;
        let refresh_token = self.refresh_tokens.issue(user_id, cancel).await?;

        tracing::info!(user_id = %user_id, "User logged in");
        Ok(LoginSession {
            user_id,
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new access token
    ///
    /// # Errors
    /// `Unauthorized` whenever the refresh token is unknown, revoked or expired
    pub async fn refresh(
        &self,
        refresh_token: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AuthError> {
        let user_id = match self.refresh_tokens.validate(refresh_token, cancel).await {
            Ok(user_id) => user_id,
            Err(e @ (AuthError::NotFound | AuthError::Revoked | AuthError::Expired)) => {
                tracing::info!(reason = %e, "Refresh rejected");
                return Err(AuthError::Unauthorized);
            }
            Err(e) => return Err(e),
        };

        let access_token = self.access_tokens.issue(user_id)?;
        tracing::debug!(user_id = %user_id, "Access token refreshed");
        Ok(access_token)
    }

    pub async fn revoke(
        &self,
        refresh_token: &str,
        cancel: &CancellationToken,
    ) -> Result<(), AuthError> {
        self.refresh_tokens.revoke(refresh_token, cancel).await
    }

    /// Check an access token and return its subject
    pub fn authenticate(&self, access_token: &str) -> Result<Uuid, AuthError> {
        self.access_tokens.validate(access_token)
    }

    // bcrypt is deliberately slow; keep it off the async workers.
    async fn verify_password(&self, password: &str, hash: String) -> Result<bool, AuthError> {
        let hasher = self.hasher;
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::HashingFailure(e.to_string()))?
    }
}
