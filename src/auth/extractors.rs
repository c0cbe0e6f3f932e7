use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::{repo_types::User, AuthError};
use crate::{error::AppError, state::AppState};

/// Extracts and validates the bearer token, yielding the caller's user id.
pub struct AuthUser(pub i64);

/// Like [`AuthUser`], but also requires the caller to be an admin right now.
/// The flag is read from the database on every request, so a promotion or
/// demotion applies to tokens already handed out.
pub struct AdminUser(pub i64);

fn authorization(parts: &Parts) -> Result<&str, AuthError> {
    let value = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;
    if value.trim().is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(value)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = authorization(parts)?;
        let claims = state.tokens.verify(header).map_err(|e| {
            warn!(reason = %e, path = %parts.uri.path(), "token rejected");
            e
        })?;
        Ok(AuthUser(claims.user_id))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;
        match User::is_admin(&state.db, user_id).await? {
            Some(true) => Ok(AdminUser(user_id)),
            Some(false) | None => {
                warn!(user_id, path = %parts.uri.path(), "admin access denied");
                Err(AppError::Forbidden("Admin access required".into()))
            }
        }
    }
}
