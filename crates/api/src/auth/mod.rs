//! Session authentication

pub mod jwt;
pub mod middleware;

use thiserror::Error;

pub use jwt::{Claims, JwtManager};
pub use middleware::{optional_auth, AuthState, AuthUser, CurrentUser};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Failed to create token: {0}")]
    TokenCreation(String),
}
