// src/services/novels.rs

//! Novel sync service.
//!
//! Entry point for reading a novel: serves the stored record, refreshing it
//! from upstream when it has gone stale, and keeps the search index, the
//! review log and saved-list markers in step with every refresh.
//!
//! Per key the flow is a small state machine:
//!
//! ```text
//! absent          -> fetch, insert, index          (fetch failure: NotFound)
//! present, paused -> stored record
//! present, fresh  -> stored record
//! present, stale  -> fetch, merge, update, index,  (fetch failure: stored record)
//!                    review log?, favorites fanout?
//! ```
//!
//! No per-key locking is done here. Two concurrent refreshes of the same
//! stale key both fetch and both write; the last write wins for the
//! change timestamps.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    Config, NovelKey, NovelOutline, NovelRecord, NovelUpdate, Page, RankOptions, ReviewRecord,
    SearchConfig, SyncUpdate, TranslationPatch, TranslatorEngine,
};
use crate::pipeline::merge::ensure_unique_chapter_ids;
use crate::pipeline::{MergeResult, ProviderTable, SearchIndex, SearchQuery, StalenessPolicy, TocMerger};
use crate::services::RemoteSource;
use crate::storage::{FavoriteStore, NovelStore, ReviewLog};

/// Concurrent store lookups when decorating listings.
const LOOKUP_CONCURRENCY: usize = 8;

/// External systems the service coordinates.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn NovelStore>,
    pub remote: Arc<dyn RemoteSource>,
    pub index: Arc<dyn SearchIndex>,
    pub reviews: Arc<dyn ReviewLog>,
    pub favorites: Arc<dyn FavoriteStore>,
}

/// A page of search results plus keys the store could not resolve.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub page: Page<NovelOutline>,
    /// Index hits with no backing record; needs out-of-band repair
    pub missing: Vec<NovelKey>,
}

/// Reads, refreshes and edits stored novels.
pub struct NovelService {
    deps: Collaborators,
    providers: ProviderTable,
    policy: StalenessPolicy,
    search: SearchConfig,
}

impl NovelService {
    pub fn new(deps: Collaborators, config: &Config) -> Result<Self> {
        Ok(Self {
            deps,
            providers: ProviderTable::new(&config.providers),
            policy: StalenessPolicy::from_config(&config.sync)?,
            search: config.search.clone(),
        })
    }

    /// Stored record without any refresh.
    pub async fn get(&self, key: &NovelKey) -> Result<Option<NovelRecord>> {
        self.deps.store.find(key).await
    }

    /// Stored record, refreshed from upstream when stale.
    pub async fn get_and_sync(&self, key: &NovelKey) -> Result<NovelRecord> {
        self.sync_with_policy(key, self.policy).await
    }

    /// Like [`get_and_sync`](Self::get_and_sync) with a caller-chosen TTL.
    pub async fn get_and_sync_with_ttl(&self, key: &NovelKey, ttl: Duration) -> Result<NovelRecord> {
        self.sync_with_policy(key, StalenessPolicy::new(ttl)).await
    }

    async fn sync_with_policy(&self, key: &NovelKey, policy: StalenessPolicy) -> Result<NovelRecord> {
        let now = Utc::now();

        let Some(local) = self.deps.store.find(key).await? else {
            return self.create_from_remote(key, now).await;
        };

        if local.pause_update {
            log::debug!("{} is paused, serving stored record", key);
            return Ok(local);
        }
        if !policy.should_refresh(&local, now) {
            return Ok(local);
        }

        self.refresh(local, now).await
    }

    /// First sight of a key: fetch and store it.
    async fn create_from_remote(&self, key: &NovelKey, now: DateTime<Utc>) -> Result<NovelRecord> {
        let snapshot = match self.deps.remote.get_metadata(key).await {
            Ok(snapshot) => snapshot,
            Err(AppError::Remote { message, .. }) => {
                log::info!("{} unavailable upstream and not stored: {}", key, message);
                return Err(AppError::not_found(key));
            }
            Err(e) => return Err(e),
        };

        let record = snapshot.into_record(key.clone(), now);
        if let Err(e) = ensure_unique_chapter_ids(&record.toc) {
            log::error!("Refusing to store {}: {}", key, e);
            return Err(e);
        }

        match self.deps.store.insert(&record).await {
            Ok(()) => {}
            Err(AppError::Duplicate { .. }) => {
                // A concurrent request stored it first
                log::debug!("{} was inserted concurrently, using stored copy", key);
                return self
                    .deps
                    .store
                    .find(key)
                    .await?
                    .ok_or_else(|| AppError::not_found(key));
            }
            Err(e) => return Err(e),
        }

        log::info!("Stored new novel {} ({} toc items)", key, record.toc.len());
        self.sync_index(&record).await;
        Ok(record)
    }

    /// Stale record: reconcile against a fresh snapshot.
    async fn refresh(&self, local: NovelRecord, now: DateTime<Utc>) -> Result<NovelRecord> {
        let key = local.key.clone();

        let snapshot = match self.deps.remote.get_metadata(&key).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Refresh of {} failed, keeping stored record: {}", key, e);
                return Ok(local);
            }
        };

        let merger = TocMerger::new(self.providers.stability(&key.provider_id));
        let MergeResult {
            toc,
            has_changed,
            review_reason,
        } = match merger.merge(&snapshot.toc_items(), &local.toc) {
            Ok(merged) => merged,
            Err(e) => {
                log::error!("Merge of {} aborted: {}", key, e);
                return Err(e);
            }
        };

        let update = SyncUpdate {
            authors: snapshot.authors.clone(),
            remote: snapshot.remote_fields(),
            toc: toc.clone(),
            sync_at: now,
            changed_at: has_changed.then_some(now),
        };
        let novel = self
            .deps
            .store
            .update(&key, NovelUpdate::Sync(update))
            .await?
            .ok_or_else(|| AppError::not_found(&key))?;

        self.sync_index(&novel).await;

        if let Some(reason) = review_reason {
            let review = ReviewRecord {
                key: key.clone(),
                toc_before: local.toc,
                toc_after: toc,
                reason: reason.to_string(),
                created_at: now,
            };
            match self.deps.reviews.append(&review).await {
                Ok(()) => log::info!("Review logged for {}: {}", key, reason),
                Err(e) => log::warn!("Could not log review for {}: {}", key, e),
            }
        }

        if has_changed {
            match self.deps.favorites.touch(&key, novel.update_at).await {
                Ok(touched) => log::debug!("Marked {} saved-list entries of {} updated", touched, key),
                Err(e) => log::warn!("Favorites fanout for {} failed: {}", key, e),
            }
        }

        Ok(novel)
    }

    async fn sync_index(&self, novel: &NovelRecord) {
        if let Err(e) = self.deps.index.sync_full(novel).await {
            log::warn!("Index sync for {} failed: {}", novel.key, e);
        }
    }

    /// Upstream ranking decorated with locally stored translation progress.
    pub async fn list_rank(
        &self,
        provider_id: &str,
        options: &RankOptions,
    ) -> Result<Vec<NovelOutline>> {
        let items = self.deps.remote.list_rank(provider_id, options).await?;

        let store = &self.deps.store;
        let lookups: Vec<_> = stream::iter(items)
            .map(|item| async move {
                let key = NovelKey::new(provider_id, item.novel_id.clone());
                store.find(&key).await.map(|local| (item, local))
            })
            .buffered(LOOKUP_CONCURRENCY)
            .collect()
            .await;

        lookups
            .into_iter()
            .map(|lookup| {
                lookup.map(|(item, local)| NovelOutline::from_rank(provider_id, item, local.as_ref()))
            })
            .collect()
    }

    /// Run a query against the index and resolve hits against the store.
    pub async fn search(&self, mut query: SearchQuery) -> Result<SearchOutcome> {
        query.page_size = match query.page_size {
            0 => self.search.default_page_size,
            n => n.min(self.search.max_page_size),
        };

        let hits = self.deps.index.search(&query).await?;

        let store = &self.deps.store;
        let mut lookups = stream::iter(hits.keys)
            .map(|key| async move {
                let found = store.find(&key).await;
                (key, found)
            })
            .buffered(LOOKUP_CONCURRENCY);

        let mut items = Vec::new();
        let mut missing = Vec::new();
        while let Some((key, found)) = lookups.next().await {
            match found? {
                Some(novel) => items.push(NovelOutline::from(&novel)),
                None => {
                    log::error!("Index returned {} but the store has no such record", key);
                    missing.push(key);
                }
            }
        }

        Ok(SearchOutcome {
            page: Page {
                items,
                total: hits.total,
                page_size: query.page_size,
            },
            missing,
        })
    }

    /// Replace translated title, introduction and toc titles.
    pub async fn update_translation(
        &self,
        key: &NovelKey,
        patch: TranslationPatch,
    ) -> Result<Option<NovelRecord>> {
        let update = NovelUpdate::Translation {
            patch,
            changed_at: Utc::now(),
        };
        let novel = self.deps.store.update(key, update).await?;
        if let Some(novel) = &novel {
            self.sync_index(novel).await;
        }
        Ok(novel)
    }

    /// Replace the glossary and issue a fresh version token.
    pub async fn update_glossary(
        &self,
        key: &NovelKey,
        glossary: BTreeMap<String, String>,
    ) -> Result<Option<NovelRecord>> {
        let update = NovelUpdate::Glossary {
            glossary,
            version: Uuid::new_v4().to_string(),
        };
        self.deps.store.update(key, update).await
    }

    /// Record a translation pipeline's completed chapter count.
    pub async fn update_engine_count(
        &self,
        key: &NovelKey,
        engine: TranslatorEngine,
        count: u64,
    ) -> Result<Option<NovelRecord>> {
        let novel = self
            .deps
            .store
            .update(key, NovelUpdate::EngineCount { engine, count })
            .await?;
        if let Some(novel) = &novel {
            self.sync_index(novel).await;
        }
        Ok(novel)
    }

    /// Link or unlink the separate catalog entry.
    pub async fn update_catalog_ref(
        &self,
        key: &NovelKey,
        catalog_id: Option<String>,
    ) -> Result<Option<NovelRecord>> {
        self.deps
            .store
            .update(key, NovelUpdate::CatalogRef(catalog_id))
            .await
    }

    /// Freeze or unfreeze structural sync.
    pub async fn set_pause_update(&self, key: &NovelKey, paused: bool) -> Result<Option<NovelRecord>> {
        self.deps
            .store
            .update(key, NovelUpdate::PauseUpdate(paused))
            .await
    }
}
