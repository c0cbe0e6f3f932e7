use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::{auth::repo_types::User, validation::escape_like};

/// Row counts over the rolling reporting periods, by calendar day (UTC).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct PeriodCounts {
    pub total: i64,
    pub today: i64,
    pub week: i64,
    pub month: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct DayCount {
    pub date: String, // YYYY-MM-DD
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub users: PeriodCounts,
    pub audits: PeriodCounts,
    pub registrations_by_day: Vec<DayCount>,
}

#[derive(Debug, Clone, Copy)]
enum Counted {
    Users,
    Audits,
}

impl Counted {
    fn table(self) -> &'static str {
        match self {
            Counted::Users => "users",
            Counted::Audits => "audits",
        }
    }
}

async fn period_counts(db: &SqlitePool, counted: Counted) -> sqlx::Result<PeriodCounts> {
    sqlx::query_as::<_, PeriodCounts>(&format!(
        r#"
        SELECT COUNT(*) AS total,
               COALESCE(SUM(DATE(created_at) = DATE('now')), 0) AS today,
               COALESCE(SUM(DATE(created_at) >= DATE('now', '-7 days')), 0) AS week,
               COALESCE(SUM(DATE(created_at) >= DATE('now', '-30 days')), 0) AS month
        FROM {}
        "#,
        counted.table()
    ))
    .fetch_one(db)
    .await
}

pub async fn stats(db: &SqlitePool) -> sqlx::Result<Stats> {
    let users = period_counts(db, Counted::Users).await?;
    let audits = period_counts(db, Counted::Audits).await?;
    let registrations_by_day = sqlx::query_as::<_, DayCount>(
        r#"
        SELECT DATE(created_at) AS date, COUNT(*) AS count
        FROM users
        WHERE DATE(created_at) >= DATE('now', '-30 days')
        GROUP BY DATE(created_at)
        ORDER BY date DESC
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(Stats {
        users,
        audits,
        registrations_by_day,
    })
}

const SEARCH_FILTER: &str =
    r"WHERE email LIKE ? ESCAPE '\' OR first_name LIKE ? ESCAPE '\' OR last_name LIKE ? ESCAPE '\'";

/// One page of users, newest first, plus the total matching `search`.
/// `search` matches a substring of email, first or last name; wildcards in it
/// are taken literally.
pub async fn list_users(
    db: &SqlitePool,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> sqlx::Result<(Vec<User>, i64)> {
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)));
    let filter = if pattern.is_some() { SEARCH_FILTER } else { "" };

    let count_sql = format!("SELECT COUNT(*) FROM users {filter}");
    let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(p) = &pattern {
        count = count.bind(p.as_str()).bind(p.as_str()).bind(p.as_str());
    }
    let total = count.fetch_one(db).await?;

    let list_sql = format!(
        "SELECT id, email, password_hash, first_name, last_name, created_at, \
         subscription_status, plan_type, is_admin \
         FROM users {filter} ORDER BY id DESC LIMIT ? OFFSET ?"
    );
    let mut list = sqlx::query_as::<_, User>(&list_sql);
    if let Some(p) = &pattern {
        list = list.bind(p.as_str()).bind(p.as_str()).bind(p.as_str());
    }
    let users = list.bind(limit).bind(offset).fetch_all(db).await?;

    Ok((users, total))
}
