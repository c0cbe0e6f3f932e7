//! In-memory sliding-window rate limiting with optional address blocking.
//!
//! Each [`RateLimiter`] owns its own counters, so the global limit, the
//! per-route limits and the critical-operation guard never share state.
//! Counters live in process memory only and are lost on restart.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use parking_lot::Mutex;
use tracing::warn;

use super::client::client_address;
use crate::{config::RateLimitPolicy, error::AppError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("Too many requests, please retry later")]
    Limited { retry_after: Duration },
    #[error("Too many requests, address temporarily blocked")]
    Blocked { retry_after: Duration },
}

impl RateLimitError {
    pub fn code(&self) -> &'static str {
        match self {
            RateLimitError::Limited { .. } => "rate_limited",
            RateLimitError::Blocked { .. } => "ip_blocked",
        }
    }

    /// Whole seconds to wait, never zero.
    pub fn retry_after_secs(&self) -> u64 {
        let d = match self {
            RateLimitError::Limited { retry_after } | RateLimitError::Blocked { retry_after } => {
                *retry_after
            }
        };
        let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
        secs.max(1)
    }
}

#[derive(Debug, Default)]
struct Entry {
    hits: VecDeque<Instant>,
    blocked_until: Option<Instant>,
}

impl Entry {
    /// Nothing left to remember: no active block and no hit inside the window.
    fn is_stale(&self, now: Instant, window: Duration) -> bool {
        if self.blocked_until.is_some_and(|until| now < until) {
            return false;
        }
        self.hits
            .back()
            .map_or(true, |&last| now.saturating_duration_since(last) >= window)
    }
}

/// Map size above which a check also sweeps stale entries, at most once per window.
const SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug, Default)]
struct Entries {
    by_key: HashMap<String, Entry>,
    last_sweep: Option<Instant>,
}

pub struct RateLimiter {
    name: &'static str,
    policy: RateLimitPolicy,
    entries: Mutex<Entries>,
}

impl RateLimiter {
    pub fn new(name: &'static str, policy: RateLimitPolicy) -> Self {
        Self {
            name,
            policy,
            entries: Mutex::new(Entries::default()),
        }
    }

    pub fn check(&self, key: &str) -> Result<(), RateLimitError> {
        self.check_at(key, Instant::now())
    }

    /// Records a request from `key` at `now`, or rejects it.
    ///
    /// The block check, pruning, limit check and append all happen under a
    /// single lock, so concurrent requests from one address cannot both slip
    /// under the limit.
    pub fn check_at(&self, key: &str, now: Instant) -> Result<(), RateLimitError> {
        let mut entries = self.entries.lock();
        let window = self.policy.window;

        let sweep_due = entries.by_key.len() >= SWEEP_THRESHOLD
            && entries
                .last_sweep
                .map_or(true, |at| now.saturating_duration_since(at) >= window);
        if sweep_due {
            entries.by_key.retain(|_, e| !e.is_stale(now, window));
            entries.last_sweep = Some(now);
        }

        let entry = entries.by_key.entry(key.to_string()).or_default();

        if let Some(until) = entry.blocked_until {
            if now < until {
                return Err(RateLimitError::Blocked {
                    retry_after: until - now,
                });
            }
            // block served: start counting from scratch
            entry.blocked_until = None;
            entry.hits.clear();
        }

        while let Some(&oldest) = entry.hits.front() {
            if now.saturating_duration_since(oldest) >= window {
                entry.hits.pop_front();
            } else {
                break;
            }
        }

        if entry.hits.len() >= self.policy.max_requests {
            return Err(match self.policy.block_duration {
                Some(block) => {
                    entry.blocked_until = Some(now + block);
                    warn!(limiter = self.name, client = %key, block_secs = block.as_secs(), "client blocked");
                    RateLimitError::Blocked { retry_after: block }
                }
                None => {
                    let oldest = entry.hits.front().copied().unwrap_or(now);
                    warn!(limiter = self.name, client = %key, "rate limit exceeded");
                    RateLimitError::Limited {
                        retry_after: window.saturating_sub(now.saturating_duration_since(oldest)),
                    }
                }
            });
        }

        entry.hits.push_back(now);
        Ok(())
    }

    /// Drops every entry with no active block and no hit inside the window.
    pub fn cleanup_at(&self, now: Instant) {
        let mut entries = self.entries.lock();
        let window = self.policy.window;
        entries.by_key.retain(|_, e| !e.is_stale(now, window));
        entries.last_sweep = Some(now);
    }

    /// Number of client keys currently held in memory.
    pub fn tracked_keys(&self) -> usize {
        self.entries.lock().by_key.len()
    }

    /// Requests currently counted for `key` (without pruning).
    pub fn tracked_requests(&self, key: &str) -> usize {
        self.entries.lock().by_key.get(key).map_or(0, |e| e.hits.len())
    }

    pub fn is_blocked_at(&self, key: &str, now: Instant) -> bool {
        self.entries
            .lock()
            .by_key
            .get(key)
            .and_then(|e| e.blocked_until)
            .is_some_and(|until| now < until)
    }

    pub fn reset(&self) {
        *self.entries.lock() = Entries::default();
    }
}

/// All limiters of the service, built once at startup and shared via state.
#[derive(Clone)]
pub struct RateLimiters {
    pub global: Arc<RateLimiter>,
    pub signup: Arc<RateLimiter>,
    pub login: Arc<RateLimiter>,
    pub critical: Arc<RateLimiter>,
}

impl RateLimiters {
    pub fn from_config(cfg: &crate::config::RateLimitConfig) -> Self {
        Self {
            global: Arc::new(RateLimiter::new("global", cfg.global)),
            signup: Arc::new(RateLimiter::new("signup", cfg.signup)),
            login: Arc::new(RateLimiter::new("login", cfg.login)),
            critical: Arc::new(RateLimiter::new("critical", cfg.critical)),
        }
    }
}

/// Middleware stage: count the request against `limiter`, keyed by client address.
pub async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_address(&request);
    limiter.check(&client)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn five_per_minute_allows_five_then_rejects() {
        let limiter = RateLimiter::new("test", RateLimitPolicy::per_minute(5));
        let t0 = Instant::now();
        for i in 0..5 {
            assert!(limiter.check_at("1.2.3.4", t0 + Duration::from_secs(i)).is_ok());
        }
        let err = limiter
            .check_at("1.2.3.4", t0 + Duration::from_secs(10))
            .unwrap_err();
        assert!(matches!(err, RateLimitError::Limited { .. }));
        assert_eq!(err.retry_after_secs(), 50);

        // the window slides past the first hits
        assert!(limiter.check_at("1.2.3.4", t0 + MINUTE + Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn addresses_are_counted_independently() {
        let limiter = RateLimiter::new("test", RateLimitPolicy::per_minute(1));
        let t0 = Instant::now();
        assert!(limiter.check_at("a", t0).is_ok());
        assert!(limiter.check_at("b", t0).is_ok());
        assert!(limiter.check_at("a", t0).is_err());
    }

    #[test]
    fn rejected_requests_are_not_counted() {
        let limiter = RateLimiter::new("test", RateLimitPolicy::per_minute(2));
        let t0 = Instant::now();
        limiter.check_at("a", t0).unwrap();
        limiter.check_at("a", t0).unwrap();
        for _ in 0..10 {
            assert!(limiter.check_at("a", t0).is_err());
        }
        assert_eq!(limiter.tracked_requests("a"), 2);
    }

    #[test]
    fn advanced_guard_blocks_then_resets() {
        let limiter = RateLimiter::new("critical", RateLimitPolicy::blocking(3, 10, 30));
        let t0 = Instant::now();
        for i in 0..3 {
            assert!(limiter.check_at("ip", t0 + Duration::from_secs(i)).is_ok());
        }

        let err = limiter.check_at("ip", t0 + Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, RateLimitError::Blocked { .. }));
        assert!(limiter.is_blocked_at("ip", t0 + Duration::from_secs(6)));

        // well past the 10 minute window but still inside the 30 minute block
        let during = t0 + 20 * MINUTE;
        assert!(matches!(
            limiter.check_at("ip", during),
            Err(RateLimitError::Blocked { .. })
        ));

        let after = t0 + Duration::from_secs(5) + 30 * MINUTE;
        assert!(!limiter.is_blocked_at("ip", after));
        assert!(limiter.check_at("ip", after).is_ok());
        assert_eq!(limiter.tracked_requests("ip"), 1);
        assert!(limiter.check_at("ip", after).is_ok());
        assert!(limiter.check_at("ip", after).is_ok());
        assert!(limiter.check_at("ip", after).is_err());
    }

    #[test]
    fn concurrent_requests_cannot_exceed_limit() {
        let limiter = Arc::new(RateLimiter::new("test", RateLimitPolicy::per_minute(10)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    (0..10).filter(|_| limiter.check("same").is_ok()).count()
                })
            })
            .collect();
        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 10);
    }

    #[test]
    fn stale_keys_are_swept_once_the_map_grows() {
        let limiter = RateLimiter::new("global", RateLimitPolicy::per_hour(1000));
        let t0 = Instant::now();
        for i in 0..10_000 {
            limiter.check_at(&format!("10.0.{}.{}", i / 256, i % 256), t0).unwrap();
        }
        assert_eq!(limiter.tracked_keys(), 10_000);

        limiter.check_at("fresh", t0 + 3 * 60 * MINUTE).unwrap();
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn cleanup_keeps_live_and_blocked_entries() {
        let limiter = RateLimiter::new("critical", RateLimitPolicy::blocking(1, 10, 30));
        let t0 = Instant::now();
        limiter.check_at("old", t0).unwrap();
        limiter.check_at("blocked", t0).unwrap();
        assert!(limiter.check_at("blocked", t0).is_err());
        limiter.check_at("recent", t0 + 15 * MINUTE).unwrap();

        limiter.cleanup_at(t0 + 20 * MINUTE);
        assert_eq!(limiter.tracked_keys(), 2);
        assert!(limiter.is_blocked_at("blocked", t0 + 20 * MINUTE));
        assert_eq!(limiter.tracked_requests("old"), 0);

        limiter.cleanup_at(t0 + 60 * MINUTE);
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn reset_clears_everything() {
        let limiter = RateLimiter::new("test", RateLimitPolicy::per_minute(1));
        limiter.check("a").unwrap();
        limiter.reset();
        assert_eq!(limiter.tracked_requests("a"), 0);
        assert_eq!(limiter.tracked_keys(), 0);
        assert!(limiter.check("a").is_ok());
    }
}
