/// Authentication Routes
///
/// Login, access token refresh, refresh token revocation and current user lookup.

use actix_web::{http::header::AUTHORIZATION, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::auth::{extract_bearer_token, AuthService};
use crate::error::AuthError;
use crate::middleware::AuthenticatedUser;

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response with access and refresh tokens
#[derive(Serialize)]
pub struct LoginResponse {
    pub id: String,
    pub email: String,
    pub token: String,
    pub refresh_token: String,
}

/// Refresh response with a new access token
#[derive(Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

/// Current user response
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
}

/// Process-wide shutdown signal; each request works on a child of it
#[derive(Clone, Default)]
pub struct Shutdown(pub CancellationToken);

fn bearer_token(req: &HttpRequest) -> Result<&str, AuthError> {
    let header = req.headers().get(AUTHORIZATION).and_then(|h| h.to_str().ok());
    extract_bearer_token(header)
}

/// POST /api/login
///
/// # Errors
/// - 401: Invalid credentials (unknown email and wrong password are indistinguishable)
/// - 500: Hashing, signing, entropy or storage failure
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
    shutdown: web::Data<Shutdown>,
) -> Result<HttpResponse, AuthError> {
    let cancel = shutdown.0.child_token();
    let session = auth.login(&form.email, &form.password, &cancel).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        id: session.user_id.to_string(),
        email: form.into_inner().email,
        token: session.access_token,
        refresh_token: session.refresh_token.token,
    }))
}

/// POST /api/refresh
///
/// Requires `Authorization: Bearer <refresh_token>`. The refresh token is not rotated.
///
/// # Errors
/// - 401: Missing header, or unknown, revoked or expired refresh token
pub async fn refresh(
    req: HttpRequest,
    auth: web::Data<AuthService>,
    shutdown: web::Data<Shutdown>,
) -> Result<HttpResponse, AuthError> {
    let refresh_token = bearer_token(&req)?;
    let cancel = shutdown.0.child_token();
    let token = auth.refresh(refresh_token, &cancel).await?;

    Ok(HttpResponse::Ok().json(RefreshResponse { token }))
}

/// POST /api/revoke
///
/// Requires `Authorization: Bearer <refresh_token>`. Revoking twice is not an error.
pub async fn revoke(
    req: HttpRequest,
    auth: web::Data<AuthService>,
    shutdown: web::Data<Shutdown>,
) -> Result<HttpResponse, AuthError> {
    let refresh_token = bearer_token(&req)?;
    let cancel = shutdown.0.child_token();
    auth.revoke(refresh_token, &cancel).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/me
///
/// **Requires valid JWT access token**; the user is injected by `JwtMiddleware`.
pub async fn get_current_user(user: web::ReqData<AuthenticatedUser>) -> HttpResponse {
    HttpResponse::Ok().json(UserResponse {
        id: user.user_id.to_string(),
    })
}
