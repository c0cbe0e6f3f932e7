use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::audits::repo_types::Audit;

const AUDIT_COLUMNS: &str = "id, user_id, url, status, results, created_at, completed_at";

impl Audit {
    pub async fn create(db: &SqlitePool, user_id: i64, url: &str) -> sqlx::Result<Audit> {
        sqlx::query_as::<_, Audit>(&format!(
            r#"
            INSERT INTO audits (user_id, url, status, created_at)
            VALUES (?, ?, 'pending', ?)
            RETURNING {AUDIT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(url)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(db)
        .await
    }

    /// Newest first (ids grow with creation time). Every query here is
    /// scoped by `user_id`.
    pub async fn list_by_user(
        db: &SqlitePool,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> sqlx::Result<Vec<Audit>> {
        sqlx::query_as::<_, Audit>(&format!(
            r#"
            SELECT {AUDIT_COLUMNS}
            FROM audits
            WHERE user_id = ?
            ORDER BY id DESC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    /// `None` both when the audit does not exist and when another user owns it.
    pub async fn find_for_user(db: &SqlitePool, user_id: i64, id: i64) -> sqlx::Result<Option<Audit>> {
        sqlx::query_as::<_, Audit>(&format!(
            "SELECT {AUDIT_COLUMNS} FROM audits WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
    }
}
