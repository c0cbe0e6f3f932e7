use std::time::Duration;

use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;

pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_hours: i64,
}

/// Sliding-window limit, optionally blocking the client once exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: usize,
    pub window: Duration,
    pub block_duration: Option<Duration>,
}

impl RateLimitPolicy {
    pub fn per_minute(max_requests: usize) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
            block_duration: None,
        }
    }

    pub fn per_hour(max_requests: usize) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60 * 60),
            block_duration: None,
        }
    }

    pub fn blocking(max_requests: usize, window_minutes: u64, block_duration_minutes: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_minutes * 60),
            block_duration: Some(Duration::from_secs(block_duration_minutes * 60)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub global: RateLimitPolicy,
    pub signup: RateLimitPolicy,
    pub login: RateLimitPolicy,
    pub critical: RateLimitPolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global: RateLimitPolicy::per_hour(1000),
            signup: RateLimitPolicy::per_minute(5),
            login: RateLimitPolicy::per_minute(10),
            critical: RateLimitPolicy::blocking(100, 10, 30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub environment: Environment,
    pub jwt: JwtConfig,
    pub rate_limits: RateLimitConfig,
    pub request_signing: bool,
    pub max_body_bytes: usize,
    pub admin: Option<AdminBootstrap>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = match std::env::var("APP_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        };

        let secret = match std::env::var("JWT_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                tracing::warn!(
                    "JWT_SECRET not set; generated a random signing secret, \
                     tokens issued before this start are no longer valid"
                );
                random_secret()
            }
        };
        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "cybak-api".into()),
            ttl_hours: env_parse("JWT_EXPIRATION_HOURS", 24),
        };

        let rate_limits = RateLimitConfig {
            global: RateLimitPolicy::per_hour(env_parse("RATE_LIMIT_GLOBAL_PER_HOUR", 1000)),
            signup: RateLimitPolicy::per_minute(env_parse("RATE_LIMIT_SIGNUP_PER_MINUTE", 5)),
            login: RateLimitPolicy::per_minute(env_parse("RATE_LIMIT_LOGIN_PER_MINUTE", 10)),
            critical: RateLimitPolicy::blocking(
                env_parse("CRITICAL_MAX_REQUESTS", 100),
                env_parse("CRITICAL_WINDOW_MINUTES", 10),
                env_parse("CRITICAL_BLOCK_MINUTES", 30),
            ),
        };

        let admin = match (std::env::var("ADMIN_EMAIL"), std::env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminBootstrap { email, password })
            }
            _ => None,
        };

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://cybak.db".into()),
            environment,
            jwt,
            rate_limits,
            request_signing: env_parse("REQUEST_SIGNING_ENABLED", false),
            max_body_bytes: env_parse("MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),
            admin,
        })
    }

    /// Configuration for tests and tooling: fixed secret, in-memory database.
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            environment: Environment::Development,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "cybak-api".into(),
                ttl_hours: 24,
            },
            rate_limits: RateLimitConfig::default(),
            request_signing: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            admin: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn random_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}
