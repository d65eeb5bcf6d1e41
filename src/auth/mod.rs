/// Authentication module
///
/// Password hashing, bearer extraction, access token (JWT) issuance and
/// validation, refresh token lifecycle, and the login/refresh flows built on them.

mod bearer;
mod claims;
mod jwt;
mod password;
mod refresh_token;
mod service;

pub use bearer::extract_bearer_token;
pub use claims::Claims;
pub use jwt::{ensure_hmac, AccessTokenCodec};
pub use password::PasswordHasher;
pub use refresh_token::{generate_refresh_token, RefreshToken, RefreshTokenService};
pub use service::{AuthService, LoginSession};
