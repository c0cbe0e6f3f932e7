pub(crate) mod dto;
pub mod handlers;
pub mod repo;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::{
    security::{rate_limit::enforce, signature::require_signature},
    state::AppState,
};

/// Every route here requires an admin token. Promotion additionally passes
/// the critical-operation guard (outermost) and the request signature check.
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(handlers::stats))
        .route("/admin/users", get(handlers::list_users))
        .route("/admin/users/:id/audits", get(handlers::user_audits))
        .route(
            "/admin/promote/:id",
            post(handlers::promote)
                .layer(from_fn_with_state(state.clone(), require_signature))
                .layer(from_fn_with_state(state.limiters.critical.clone(), enforce)),
        )
}
