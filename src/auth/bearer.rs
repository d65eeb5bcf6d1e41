/// Bearer Token Extraction
///
/// Pulls the raw token out of an `Authorization` header value.

use crate::error::AuthError;

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the token from an `Authorization: Bearer <token>` header value
///
/// The prefix is case-sensitive with exactly one space; nothing else is trimmed.
///
/// # Errors
/// `MalformedHeader` if the header is absent, empty, lacks the prefix,
/// or carries nothing after it
pub fn extract_bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    match header.and_then(|h| h.strip_prefix(BEARER_PREFIX)) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}
