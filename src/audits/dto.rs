use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use super::repo_types::Audit;

#[derive(Debug, Deserialize)]
pub struct CreateAuditRequest {
    pub url: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditView {
    pub id: i64,
    pub url: String,
    pub status: String,
    pub results: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

impl From<Audit> for AuditView {
    fn from(a: Audit) -> Self {
        Self {
            id: a.id,
            url: a.url,
            status: a.status,
            results: a.results,
            created_at: a.created_at,
            completed_at: a.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub audit: AuditView,
}

#[derive(Debug, Serialize)]
pub struct AuditListResponse {
    pub audits: Vec<AuditView>,
}
