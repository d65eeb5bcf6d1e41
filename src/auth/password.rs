/// Password Hashing and Verification
///
/// Passwords are hashed with bcrypt; the salt and cost travel inside the digest.

use crate::configuration::AuthSettings;
use crate::error::AuthError;

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(settings.password_hash_cost)
    }

    /// Hash a password with a fresh random salt
    ///
    /// # Errors
    /// `HashingFailure` if the cost is out of range or the salt cannot be drawn
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        bcrypt::hash(password, self.cost).map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            AuthError::HashingFailure(e.to_string())
        })
    }

    /// Verify a password against a stored digest
    ///
    /// A wrong password is `Ok(false)`. bcrypt compares the digests in constant time.
    ///
    /// # Errors
    /// `HashingFailure` if `hash` is not a well-formed bcrypt digest
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        bcrypt::verify(password, hash).map_err(|e| AuthError::HashingFailure(e.to_string()))
    }
}
