use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MeResponse, SignupRequest},
        repo_types::{NewUser, User},
        AuthError, AuthUser,
    },
    error::{AppError, AppResult},
    state::AppState,
    validation::{is_valid_email, normalize_email, sanitize_input, validate_password, NAME_MAX_LEN},
};

fn require_credentials(email: &str, password: &str) -> AppResult<()> {
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation("Email and password are required".into()));
    }
    if !is_valid_email(email) {
        return Err(AppError::Validation("Invalid email format".into()));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let Json(payload) = payload?;
    let email = normalize_email(&payload.email);
    require_credentials(&email, &payload.password)?;
    validate_password(&payload.password).map_err(|rule| {
        warn!(%rule, "signup password rejected");
        AppError::Validation(rule.to_string())
    })?;

    let first_name = sanitize_input(payload.first_name.as_ref(), NAME_MAX_LEN);
    let last_name = sanitize_input(payload.last_name.as_ref(), NAME_MAX_LEN);
    let hash = state.passwords.hash(&payload.password)?;

    let user = User::create(
        &state.db,
        &NewUser {
            email: &email,
            password_hash: &hash,
            first_name: &first_name,
            last_name: &last_name,
            is_admin: false,
        },
    )
    .await
    .map_err(|e| {
        let err = AppError::from(e);
        if matches!(err, AppError::Conflict(_)) {
            warn!(email = %email, "email already registered");
        }
        err
    })?;

    let token = state.tokens.issue(user.id, &user.email)?;
    info!(user_id = user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let Json(payload) = payload?;
    let email = normalize_email(&payload.email);
    require_credentials(&email, &payload.password)?;

    let user = User::find_by_email(&state.db, &email).await?;
    // one Argon2 verification on both paths keeps the timing uniform
    let ok = state
        .passwords
        .verify_or_dummy(&payload.password, user.as_ref().map(|u| u.password_hash.as_str()));

    let user = match user {
        Some(u) if ok => u,
        Some(u) => {
            warn!(user_id = u.id, "login invalid password");
            return Err(AuthError::InvalidCredentials.into());
        }
        None => {
            warn!(email = %email, "login unknown email");
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    let token = state.tokens.issue(user.id, &user.email)?;
    info!(user_id = user.id, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<MeResponse>> {
    let user = User::find_by_id(&state.db, user_id).await?.ok_or_else(|| {
        warn!(user_id, "token refers to a missing user");
        AppError::NotFound("User not found".into())
    })?;
    Ok(Json(MeResponse { user: user.into() }))
}
