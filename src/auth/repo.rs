use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::auth::repo_types::{NewUser, User};

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, created_at, \
                            subscription_status, plan_type, is_admin";

impl User {
    /// Find a user by (already normalized) email.
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Insert a user. A duplicate email surfaces as the unique-index
    /// violation from SQLite, which also covers concurrent signups.
    pub async fn create(db: &SqlitePool, new: &NewUser<'_>) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, created_at, is_admin)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(OffsetDateTime::now_utc())
        .bind(new.is_admin)
        .fetch_one(db)
        .await
    }

    /// Current admin flag, read fresh. `None` when the user no longer exists.
    pub async fn is_admin(db: &SqlitePool, id: i64) -> sqlx::Result<Option<bool>> {
        sqlx::query_scalar::<_, bool>("SELECT is_admin FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn any_admin(db: &SqlitePool) -> sqlx::Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE is_admin = 1)")
            .fetch_one(db)
            .await
    }

    /// Returns false when no user has that id.
    pub async fn promote(db: &SqlitePool, id: i64) -> sqlx::Result<bool> {
        let result = sqlx::query("UPDATE users SET is_admin = 1 WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
