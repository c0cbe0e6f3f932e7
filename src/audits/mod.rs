pub(crate) mod dto;
pub mod handlers;
mod repo;
pub mod repo_types;

use axum::{routing::get, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/audits", get(handlers::list_audits).post(handlers::create_audit))
        .route("/audits/:id", get(handlers::get_audit))
}
