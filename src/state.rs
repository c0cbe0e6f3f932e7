use std::sync::Arc;

use sqlx::SqlitePool;

use crate::{
    auth::{jwt::TokenService, password::PasswordService},
    config::AppConfig,
    db,
    security::rate_limit::RateLimiters,
};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenService>,
    pub passwords: Arc<PasswordService>,
    pub limiters: RateLimiters,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = db::connect(&config.database_url).await?;
        Self::from_parts(db, config)
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let tokens = Arc::new(TokenService::new(&config.jwt));
        let passwords = Arc::new(PasswordService::new()?);
        let limiters = RateLimiters::from_config(&config.rate_limits);
        Ok(Self {
            db,
            config,
            tokens,
            passwords,
            limiters,
        })
    }
}
