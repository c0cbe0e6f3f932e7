use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{MessageResponse, PageInfo, UserAuditsResponse, UserListQuery, UserListResponse},
    repo::{self, Stats},
};
use crate::{
    audits::{dto::Pagination, repo_types::Audit},
    auth::{repo_types::User, AdminUser},
    error::{AppError, AppResult},
    state::AppState,
    validation::{clamp_pagination, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
};

#[instrument(skip(state))]
pub async fn stats(State(state): State<AppState>, AdminUser(admin_id): AdminUser) -> AppResult<Json<Stats>> {
    Ok(Json(repo::stats(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    query: Result<Query<UserListQuery>, QueryRejection>,
) -> AppResult<Json<UserListResponse>> {
    let Query(q) = query?;
    let page = q.page.unwrap_or(1).max(1);
    let per_page = q.per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1).saturating_mul(per_page);

    let (users, total) = repo::list_users(&state.db, q.search.as_deref(), per_page, offset).await?;
    Ok(Json(UserListResponse {
        users: users.into_iter().map(Into::into).collect(),
        pagination: PageInfo::new(page, per_page, total),
    }))
}

#[instrument(skip(state))]
pub async fn user_audits(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<Pagination>, QueryRejection>,
) -> AppResult<Json<UserAuditsResponse>> {
    let Path(user_id) = path?;
    let Query(p) = query?;
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    let (limit, offset) = clamp_pagination(p.limit, p.offset);
    let audits = Audit::list_by_user(&state.db, user_id, limit, offset).await?;
    Ok(Json(UserAuditsResponse {
        user: user.into(),
        audits: audits.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn promote(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Path(user_id) = path?;
    if !User::promote(&state.db, user_id).await? {
        warn!(admin_id, user_id, "promotion target not found");
        return Err(AppError::NotFound("User not found".into()));
    }
    info!(admin_id, user_id, "user promoted to admin");
    Ok(Json(MessageResponse {
        message: "User promoted to admin",
    }))
}
