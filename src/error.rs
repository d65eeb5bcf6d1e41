/// Error Handling Module
///
/// Two layers of errors live here:
/// 1. `DatabaseError` - what the persistence collaborators report
/// 2. `AuthError` - the credential and session taxonomy every core operation returns
///
/// `AuthError` also knows how to render itself as an HTTP response, and how loudly
/// it should be logged: validation failures are the client's problem, infrastructure
/// failures are ours.

use actix_web::error::{InternalError, JsonPayloadError, ResponseError};
use actix_web::{http::StatusCode, HttpRequest, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. PERSISTENCE ERRORS
/// ============================================================================

/// Database operation errors reported by `UserLookup` / `RefreshTokenStore`
#[derive(Debug)]
pub enum DatabaseError {
    UniqueConstraintViolation(String),
    ConnectionPool(String),
    QueryExecution(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UniqueConstraintViolation(msg) => {
                write!(f, "Duplicate entry: {}", msg)
            }
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.code().as_deref() == Some("23505") => {
                DatabaseError::UniqueConstraintViolation(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::ConnectionPool(err.to_string())
            }
            other => DatabaseError::QueryExecution(other.to_string()),
        }
    }
}

/// ============================================================================
/// 2. AUTHENTICATION ERRORS
/// ============================================================================

/// Every failure a credential or session operation can produce
#[derive(Debug)]
pub enum AuthError {
    /// Login failed; deliberately silent about which part was wrong
    InvalidCredentials,
    /// Refresh token unusable; the precise reason is only logged
    Unauthorized,
    MalformedHeader,
    BadSignature,
    Expired,
    MalformedSubject,
    NotFound,
    Revoked,
    HashingFailure(String),
    SigningFailure(String),
    EntropyFailure(String),
    ConflictError(String),
    Storage(String),
    Cancelled,
}

impl AuthError {
    /// True when the failure is an environment or dependency problem rather than
    /// something the caller did.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            AuthError::HashingFailure(_)
                | AuthError::SigningFailure(_)
                | AuthError::EntropyFailure(_)
                | AuthError::ConflictError(_)
                | AuthError::Storage(_)
        )
    }

    /// Stable machine-readable code exposed to clients
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::Unauthorized => "UNAUTHORIZED",
            AuthError::MalformedHeader => "MALFORMED_HEADER",
            AuthError::BadSignature | AuthError::Expired | AuthError::MalformedSubject => {
                "TOKEN_INVALID"
            }
            AuthError::NotFound | AuthError::Revoked => "UNAUTHORIZED",
            AuthError::Cancelled => "CANCELLED",
            _ => "INTERNAL_ERROR",
        }
    }

    pub fn log(&self, request_id: &str) {
        if self.is_infrastructure() {
            tracing::error!(request_id = request_id, error = %self, "Authentication infrastructure failure");
        } else if matches!(self, AuthError::Cancelled) {
            tracing::info!(request_id = request_id, "Request cancelled");
        } else {
            tracing::warn!(request_id = request_id, error = %self, "Authentication rejected");
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::Unauthorized => write!(f, "Unauthorized"),
            AuthError::MalformedHeader => write!(f, "Malformed authorization header"),
            AuthError::BadSignature => write!(f, "Token signature is invalid"),
            AuthError::Expired => write!(f, "Token has expired"),
            AuthError::MalformedSubject => write!(f, "Token subject is not a user id"),
            AuthError::NotFound => write!(f, "Token not found"),
            AuthError::Revoked => write!(f, "Token has been revoked"),
            AuthError::HashingFailure(msg) => write!(f, "Password hashing failed: {}", msg),
            AuthError::SigningFailure(msg) => write!(f, "Token signing failed: {}", msg),
            AuthError::EntropyFailure(msg) => write!(f, "Random source failed: {}", msg),
            AuthError::ConflictError(msg) => write!(f, "Conflicting record: {}", msg),
            AuthError::Storage(msg) => write!(f, "Storage failure: {}", msg),
            AuthError::Cancelled => write!(f, "Operation cancelled"),
        }
    }
}

impl StdError for AuthError {}

impl From<DatabaseError> for AuthError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::UniqueConstraintViolation(msg) => AuthError::ConflictError(msg),
            other => AuthError::Storage(other.to_string()),
        }
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log(&request_id);

        let status = self.status_code();
        // Infrastructure details stay in the logs
        let message = if self.is_infrastructure() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(ErrorResponse::new(
            request_id,
            message,
            self.code().to_string(),
            status.as_u16(),
        ))
    }

    fn status_code(&self) -> StatusCode {
        if self.is_infrastructure() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else if matches!(self, AuthError::Cancelled) {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::UNAUTHORIZED
        }
    }
}

/// Renders a rejected JSON request body in the same `ErrorResponse` shape as every other error
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let request_id = uuid::Uuid::new_v4().to_string();
    tracing::warn!(request_id = %request_id, error = %err, "Rejected request body");

    let status = match &err {
        JsonPayloadError::ContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
            StatusCode::PAYLOAD_TOO_LARGE
        }
        _ => StatusCode::BAD_REQUEST,
    };
    let response = HttpResponse::build(status).json(ErrorResponse::new(
        request_id,
        "Invalid request body".to_string(),
        "INVALID_REQUEST_BODY".to_string(),
        status.as_u16(),
    ));

    InternalError::from_response(err, response).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_becomes_conflict() {
        let err: AuthError =
            DatabaseError::UniqueConstraintViolation("refresh_tokens_pkey".to_string()).into();
        assert!(matches!(err, AuthError::ConflictError(_)));
        assert!(err.is_infrastructure());
    }

    #[test]
    fn test_other_database_errors_become_storage() {
        let err: AuthError = DatabaseError::ConnectionPool("timed out".to_string()).into();
        assert!(matches!(err, AuthError::Storage(_)));
    }

    #[test]
    fn test_validation_kinds_are_unauthorized() {
        for err in [
            AuthError::InvalidCredentials,
            AuthError::Unauthorized,
            AuthError::MalformedHeader,
            AuthError::BadSignature,
            AuthError::Expired,
            AuthError::MalformedSubject,
            AuthError::NotFound,
            AuthError::Revoked,
        ] {
            assert!(!err.is_infrastructure());
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_infrastructure_kinds_are_server_errors() {
        let err = AuthError::EntropyFailure("os rng unavailable".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_cancelled_is_service_unavailable() {
        assert_eq!(
            AuthError::Cancelled.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_error_response_creation() {
        let response = ErrorResponse::new(
            "test-123".to_string(),
            "Invalid credentials".to_string(),
            "INVALID_CREDENTIALS".to_string(),
            401,
        );

        assert_eq!(response.error_id, "test-123");
        assert_eq!(response.code, "INVALID_CREDENTIALS");
        assert_eq!(response.status, 401);
    }

    #[test]
    fn test_json_error_handler_renders_error_response() {
        let req = actix_web::test::TestRequest::default().to_http_request();
        let err = json_error_handler(JsonPayloadError::ContentType, &req);
        let response = err.error_response();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }
}
