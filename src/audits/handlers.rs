use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::{
    dto::{AuditListResponse, AuditResponse, CreateAuditRequest, Pagination},
    repo_types::Audit,
};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
    validation::{clamp_pagination, sanitize_url},
};

#[instrument(skip(state, payload))]
pub async fn create_audit(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreateAuditRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuditResponse>)> {
    let Json(payload) = payload?;
    let raw = match &payload.url {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim(),
        _ => return Err(AppError::Validation("URL is required".into())),
    };
    let url = sanitize_url(raw).map_err(|reason| {
        warn!(user_id, reason, "audit url rejected");
        AppError::Validation(reason.into())
    })?;

    let audit = Audit::create(&state.db, user_id, &url).await?;
    info!(user_id, audit_id = audit.id, "audit created");
    Ok((
        StatusCode::CREATED,
        Json(AuditResponse {
            audit: audit.into(),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_audits(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<Pagination>, QueryRejection>,
) -> AppResult<Json<AuditListResponse>> {
    let Query(p) = query?;
    let (limit, offset) = clamp_pagination(p.limit, p.offset);
    let audits = Audit::list_by_user(&state.db, user_id, limit, offset).await?;
    Ok(Json(AuditListResponse {
        audits: audits.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn get_audit(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<AuditResponse>> {
    let Path(id) = path?;
    let audit = Audit::find_for_user(&state.db, user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Audit not found".into()))?;
    Ok(Json(AuditResponse {
        audit: audit.into(),
    }))
}
