use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::{security::rate_limit::enforce, state::AppState};

pub mod bootstrap;
mod claims;
pub(crate) mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;

pub use claims::Claims;
pub use extractors::{AdminUser, AuthUser};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization token")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    ExpiredToken,
    #[error("Invalid email or password")]
    InvalidCredentials,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidToken => "invalid_token",
            AuthError::ExpiredToken => "expired_token",
            AuthError::InvalidCredentials => "invalid_credentials",
        }
    }
}

/// Signup and login each carry their own per-address limit on top of the
/// global one.
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/auth/signup",
            post(handlers::signup)
                .layer(from_fn_with_state(state.limiters.signup.clone(), enforce)),
        )
        .route(
            "/auth/login",
            post(handlers::login).layer(from_fn_with_state(state.limiters.login.clone(), enforce)),
        )
        .route("/auth/me", get(handlers::me))
}
