use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Counts failed login / step-up attempts per key (e.g. `login:maria`).
/// Once `max_failures` failures land inside `window`, further attempts are
/// refused until the window has passed.
#[derive(Clone)]
pub struct AttemptLimiter {
    entries: Arc<Mutex<HashMap<String, AttemptEntry>>>,
    max_failures: u32,
    window: Duration,
}

struct AttemptEntry {
    failures: u32,
    window_start: Instant,
}

impl AttemptLimiter {
    pub fn new(max_failures: u32, window: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            max_failures,
            window,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.auth_max_attempts,
            Duration::from_secs(config.auth_window_secs),
        )
    }

    /// Err(RateLimited) while the key is locked out.
    pub async fn check(&self, key: &str) -> AppResult<()> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let Some((failures, window_start)) = entries
            .get(key)
            .map(|entry| (entry.failures, entry.window_start))
        else {
            return Ok(());
        };

        let elapsed = now.duration_since(window_start);
        if elapsed > self.window {
            entries.remove(key);
            return Ok(());
        }

        if failures >= self.max_failures {
            let retry_after = self.window.saturating_sub(elapsed);
            tracing::warn!(
                key = %key,
                retry_after_secs = retry_after.as_secs(),
                "Attempt limit exceeded"
            );
            return Err(AppError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            });
        }
        Ok(())
    }

    /// Returns how many attempts remain before lock-out.
    pub async fn record_failure(&self, key: &str) -> u32 {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let entry = entries.entry(key.to_string()).or_insert(AttemptEntry {
            failures: 0,
            window_start: now,
        });

        // Reset window if expired
        if now.duration_since(entry.window_start) > self.window {
            entry.failures = 0;
            entry.window_start = now;
        }

        entry.failures += 1;
        self.max_failures.saturating_sub(entry.failures)
    }

    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    /// Drop entries whose window has long passed. Returns how many went.
    pub async fn cleanup(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let keep_for = self.window * 2;

        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.window_start) < keep_for);
        before - entries.len()
    }

    pub async fn tracked_keys(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u32 = 3;

    fn limiter() -> AttemptLimiter {
        AttemptLimiter::new(MAX, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_allows_under_limit() {
        let limiter = limiter();

        for i in 0..MAX {
            assert!(limiter.check("login:maria").await.is_ok(), "attempt {} should be allowed", i + 1);
            limiter.record_failure("login:maria").await;
        }
    }

    #[tokio::test]
    async fn test_blocks_after_max_failures() {
        let limiter = limiter();

        for _ in 0..MAX {
            limiter.record_failure("login:maria").await;
        }

        let result = limiter.check("login:maria").await;
        assert!(matches!(result, Err(AppError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn test_different_keys_have_separate_limits() {
        let limiter = limiter();

        for _ in 0..MAX {
            limiter.record_failure("login:maria").await;
        }

        assert!(limiter.check("login:pablo").await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_clears_failures() {
        let limiter = limiter();

        for _ in 0..MAX {
            limiter.record_failure("stepup:maria").await;
        }
        limiter.reset("stepup:maria").await;

        assert!(limiter.check("stepup:maria").await.is_ok());
        assert_eq!(limiter.record_failure("stepup:maria").await, MAX - 1);
    }

    #[tokio::test]
    async fn test_cleanup_drops_expired_entries() {
        let limiter = AttemptLimiter::new(MAX, Duration::from_millis(20));

        limiter.record_failure("login:ghost1").await;
        limiter.record_failure("login:ghost2").await;
        assert_eq!(limiter.cleanup().await, 0);
        assert_eq!(limiter.tracked_keys().await, 2);

        tokio::time::sleep(Duration::from_millis(50)).await;
        limiter.record_failure("login:maria").await;

        assert_eq!(limiter.cleanup().await, 2);
        assert_eq!(limiter.tracked_keys().await, 1);
    }

    #[tokio::test]
    async fn test_window_expiry_unlocks() {
        let limiter = AttemptLimiter::new(1, Duration::from_millis(20));

        limiter.record_failure("login:maria").await;
        assert!(limiter.check("login:maria").await.is_err());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(limiter.check("login:maria").await.is_ok());
    }
}
