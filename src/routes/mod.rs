mod auth;
mod health_check;

pub use auth::{get_current_user, login, refresh, revoke, Shutdown};
pub use health_check::health_check;
