// src/pipeline/staleness.rs

//! Refresh decision for stored records.

use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::models::{NovelRecord, SyncConfig};

/// Decides whether a stored record is old enough to refetch.
#[derive(Debug, Clone, Copy)]
pub struct StalenessPolicy {
    ttl: Duration,
}

impl StalenessPolicy {
    /// Create a policy with the given time-to-live.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Fails when the configured TTL does not fit a duration.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Ok(Self::new(config.ttl()?))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether a remote refresh should be attempted for `record` at `now`.
    ///
    /// Paused records are never refreshed.
    pub fn should_refresh(&self, record: &NovelRecord, now: DateTime<Utc>) -> bool {
        if record.pause_update {
            return false;
        }
        now - record.sync_at > self.ttl
    }
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self::new(Duration::hours(20))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NovelKey, RemoteSnapshot};

    fn record_synced_at(sync_at: DateTime<Utc>) -> NovelRecord {
        let snapshot = RemoteSnapshot {
            title: "t".to_string(),
            authors: vec![],
            kind: None,
            keywords: vec![],
            attentions: vec![],
            points: None,
            total_characters: None,
            introduction: String::new(),
            toc: vec![],
        };
        snapshot.into_record(NovelKey::new("kakuyomu", "1"), sync_at)
    }

    #[test]
    fn test_stale_after_ttl() {
        let now = Utc::now();
        let policy = StalenessPolicy::new(Duration::hours(20));
        let record = record_synced_at(now - Duration::hours(21));
        assert!(policy.should_refresh(&record, now));
    }

    #[test]
    fn test_fresh_within_ttl() {
        let now = Utc::now();
        let policy = StalenessPolicy::new(Duration::hours(20));
        let record = record_synced_at(now - Duration::hours(19));
        assert!(!policy.should_refresh(&record, now));
    }

    #[test]
    fn test_exactly_ttl_is_fresh() {
        let now = Utc::now();
        let policy = StalenessPolicy::new(Duration::hours(20));
        let record = record_synced_at(now - Duration::hours(20));
        assert!(!policy.should_refresh(&record, now));
    }

    #[test]
    fn test_paused_never_refreshes() {
        let now = Utc::now();
        let policy = StalenessPolicy::default();
        let mut record = record_synced_at(now - Duration::days(365));
        record.pause_update = true;
        assert!(!policy.should_refresh(&record, now));
    }

    #[test]
    fn test_from_config_rejects_overflowing_ttl() {
        let config = SyncConfig {
            ttl_minutes: u64::MAX,
        };
        assert!(StalenessPolicy::from_config(&config).is_err());
    }

    #[test]
    fn test_default_ttl() {
        assert_eq!(StalenessPolicy::default().ttl(), Duration::minutes(1200));
    }
}
