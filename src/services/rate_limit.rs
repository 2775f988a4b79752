// src/services/rate_limit.rs

//! Admission gate for rate-limited actions.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::Result;

/// Lets an action through at most once per window for each key.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Claim the window for `key`. Returns false if it was already claimed.
    async fn try_acquire(&self, key: &str) -> Result<bool>;
}

/// Fixed-window limiter kept in process memory.
#[derive(Debug)]
pub struct WindowRateLimiter {
    window: Duration,
    claimed: Mutex<HashMap<String, Instant>>,
}

impl WindowRateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            claimed: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RateLimiter for WindowRateLimiter {
    async fn try_acquire(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let mut claimed = self.claimed.lock().await;

        // Drop expired claims
        claimed.retain(|_, at| now.duration_since(*at) < self.window);

        if claimed.contains_key(key) {
            return Ok(false);
        }
        claimed.insert(key.to_string(), now);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_call_in_window_is_rejected() {
        let limiter = WindowRateLimiter::new(Duration::from_secs(60));
        assert!(limiter.try_acquire("a").await.unwrap());
        assert!(!limiter.try_acquire("a").await.unwrap());
        assert!(limiter.try_acquire("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_window_expiry_reopens_gate() {
        let limiter = WindowRateLimiter::new(Duration::from_millis(20));
        assert!(limiter.try_acquire("a").await.unwrap());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(limiter.try_acquire("a").await.unwrap());
    }
}
