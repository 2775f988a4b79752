// src/services/visits.rs

//! Visit counting.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::models::{NovelKey, NovelUpdate, VisitConfig};
use crate::pipeline::SearchIndex;
use crate::services::{RateLimiter, WindowRateLimiter};
use crate::storage::NovelStore;

/// Counts reader visits, at most one per subject and novel per window.
pub struct VisitCounter {
    store: Arc<dyn NovelStore>,
    index: Arc<dyn SearchIndex>,
    limiter: Arc<dyn RateLimiter>,
}

impl VisitCounter {
    pub fn new(
        store: Arc<dyn NovelStore>,
        index: Arc<dyn SearchIndex>,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            store,
            index,
            limiter,
        }
    }

    /// Counter with an in-process fixed-window limiter.
    pub fn from_config(
        store: Arc<dyn NovelStore>,
        index: Arc<dyn SearchIndex>,
        config: &VisitConfig,
    ) -> Self {
        let limiter = WindowRateLimiter::new(Duration::from_secs(config.window_secs));
        Self::new(store, index, Arc::new(limiter))
    }

    /// Record a visit by `subject` (a user id or client address).
    ///
    /// Returns whether the visit was counted. A rejected visit or an unknown
    /// novel is not an error.
    pub async fn record_visit(&self, subject: &str, key: &NovelKey) -> Result<bool> {
        let gate = limiter_key(subject, key);
        if !self.limiter.try_acquire(&gate).await? {
            log::debug!("Visit to {} by {} already counted this window", key, subject);
            return Ok(false);
        }

        let Some(novel) = self.store.update(key, NovelUpdate::IncrementVisits).await? else {
            log::debug!("Visit to unknown novel {}", key);
            return Ok(false);
        };

        if let Err(e) = self.index.sync_counter(&novel).await {
            log::warn!("Visit counter sync for {} failed: {}", key, e);
        }
        Ok(true)
    }
}

fn limiter_key(subject: &str, key: &NovelKey) -> String {
    format!("web-visited:{}:{}:{}", subject, key.provider_id, key.novel_id)
}
