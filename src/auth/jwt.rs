/// Access Token Issuance and Validation
///
/// Access tokens are compact HS256 JWTs carrying `iss`, `sub`, `iat` and `exp`.
/// They are never stored; validity is re-derived from the signature and the
/// expiry on every use.

use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::AuthSettings;
use crate::error::AuthError;

const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Reject anything outside the HMAC family before the key is ever used.
///
/// Guards against algorithm confusion, e.g. a token claiming `RS256` and
/// being checked against the HMAC secret as if it were a public key.
pub fn ensure_hmac(algorithm: Algorithm) -> Result<(), AuthError> {
    if HMAC_ALGORITHMS.contains(&algorithm) {
        Ok(())
    } else {
        tracing::warn!(algorithm = ?algorithm, "Rejected token with non-HMAC algorithm");
        Err(AuthError::BadSignature)
    }
}

/// Signs and verifies access tokens with one symmetric secret
#[derive(Clone)]
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl AccessTokenCodec {
    pub fn new(secret: &[u8], issuer: impl Into<String>, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            ttl,
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(
            settings.secret.expose_secret().as_bytes(),
            settings.issuer.clone(),
            settings.access_token_ttl(),
        )
    }

    /// Issue a token for `user_id` with the configured lifetime
    pub fn issue(&self, user_id: Uuid) -> Result<String, AuthError> {
        self.issue_with_ttl(user_id, self.ttl)
    }

    /// Issue a token for `user_id` that expires `ttl` from now
    ///
    /// # Errors
    /// `SigningFailure` if the signer rejects the key or claims
    pub fn issue_with_ttl(&self, user_id: Uuid, ttl: Duration) -> Result<String, AuthError> {
        let claims = Claims::new(user_id, ttl, &self.issuer);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode access token: {}", e);
            AuthError::SigningFailure(e.to_string())
        })
    }

    /// Validate a token and return the user it was issued for
    ///
    /// # Errors
    /// - `BadSignature` if the algorithm is not HMAC, the signature or issuer does
    ///   not verify, or the token cannot be decoded at all
    /// - `Expired` once `now >= exp`
    /// - `MalformedSubject` if `sub` is not a UUID
    pub fn validate(&self, token: &str) -> Result<Uuid, AuthError> {
        let header = decode_header(token).map_err(|e| {
            tracing::debug!("Unreadable token header: {}", e);
            AuthError::BadSignature
        })?;
        ensure_hmac(header.alg)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => {
                    tracing::debug!("JWT validation error: {}", e);
                    AuthError::BadSignature
                }
            })?;

        // The library's expiry check honours leeway and `exp < now`; ours is strict.
        if claims.is_expired() {
            return Err(AuthError::Expired);
        }

        claims.user_id()
    }
}
