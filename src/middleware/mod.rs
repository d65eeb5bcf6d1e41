/// Middleware module
///
/// Request guards shared by the protected routes.

mod jwt_middleware;

pub use jwt_middleware::{AuthenticatedUser, JwtMiddleware};
