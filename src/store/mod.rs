/// Persistence collaborators
///
/// The credential core reads users and reads/writes refresh tokens only through
/// these traits. Implementations must make each single-row operation atomic.

mod memory;
mod postgres;

use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::auth::RefreshToken;
use crate::error::{AuthError, DatabaseError};

pub use memory::{InMemoryRefreshTokenStore, InMemoryUserLookup};
pub use postgres::{PgRefreshTokenStore, PgUserLookup};

/// Stored password verification material for one user
#[derive(Debug, Clone)]
pub struct Credential {
    pub user_id: Uuid,
    pub password_hash: String,
}

#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, DatabaseError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Persist a new record. A duplicate token value is a
    /// `UniqueConstraintViolation`, never an overwrite.
    async fn insert(&self, record: RefreshToken) -> Result<RefreshToken, DatabaseError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>, DatabaseError>;

    /// Set `revoked_at` if it is not set yet. Unknown tokens are not an error.
    async fn mark_revoked(&self, token: &str, at: DateTime<Utc>) -> Result<(), DatabaseError>;
}

/// Run a store call, abandoning it as soon as `cancel` fires
pub(crate) async fn with_cancellation<T, F>(
    cancel: &CancellationToken,
    call: F,
) -> Result<T, AuthError>
where
    F: Future<Output = Result<T, DatabaseError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AuthError::Cancelled),
        result = call => result.map_err(AuthError::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completed_call_passes_through() {
        let cancel = CancellationToken::new();
        let result = with_cancellation(&cancel, async { Ok::<_, DatabaseError>(7) }).await;

        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_cancelled_call_is_abandoned() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = with_cancellation(
            &cancel,
            futures::future::pending::<Result<(), DatabaseError>>(),
        )
        .await;

        assert!(matches!(result, Err(AuthError::Cancelled)));
    }

    #[tokio::test]
    async fn test_database_error_is_converted() {
        let cancel = CancellationToken::new();
        let result = with_cancellation(&cancel, async {
            Err::<(), _>(DatabaseError::QueryExecution("boom".to_string()))
        })
        .await;

        assert!(matches!(result, Err(AuthError::Storage(_))));
    }
}
