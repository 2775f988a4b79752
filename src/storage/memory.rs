// src/storage/memory.rs

//! In-memory storage backend.
//!
//! Used by tests and by embedders that keep their own persistence. Every
//! update runs under a single write lock, so field sets apply atomically.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::{FavoriteEntry, NovelKey, NovelRecord, NovelUpdate, ReviewRecord};
use crate::storage::{FavoriteStore, NovelStore, ReviewLog};

/// Memory-backed novels, review log and favorites.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    novels: RwLock<HashMap<NovelKey, NovelRecord>>,
    reviews: RwLock<Vec<ReviewRecord>>,
    favorites: RwLock<Vec<FavoriteEntry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a saved-list entry.
    pub async fn add_favorite(&self, entry: FavoriteEntry) {
        self.favorites.write().await.push(entry);
    }

    /// Snapshot of all saved-list entries.
    pub async fn favorites(&self) -> Vec<FavoriteEntry> {
        self.favorites.read().await.clone()
    }

    /// Snapshot of the whole review log.
    pub async fn reviews(&self) -> Vec<ReviewRecord> {
        self.reviews.read().await.clone()
    }
}

#[async_trait]
impl NovelStore for MemoryStorage {
    async fn find(&self, key: &NovelKey) -> Result<Option<NovelRecord>> {
        Ok(self.novels.read().await.get(key).cloned())
    }

    async fn insert(&self, record: &NovelRecord) -> Result<()> {
        let mut novels = self.novels.write().await;
        if novels.contains_key(&record.key) {
            return Err(AppError::Duplicate {
                key: record.key.clone(),
            });
        }
        novels.insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn update(&self, key: &NovelKey, update: NovelUpdate) -> Result<Option<NovelRecord>> {
        let mut novels = self.novels.write().await;
        Ok(novels.get_mut(key).map(|record| {
            update.apply(record);
            record.clone()
        }))
    }

    async fn list(&self) -> Result<Vec<NovelRecord>> {
        Ok(self.novels.read().await.values().cloned().collect())
    }
}

#[async_trait]
impl ReviewLog for MemoryStorage {
    async fn append(&self, record: &ReviewRecord) -> Result<()> {
        self.reviews.write().await.push(record.clone());
        Ok(())
    }

    async fn list_for(&self, key: &NovelKey) -> Result<Vec<ReviewRecord>> {
        Ok(self
            .reviews
            .read()
            .await
            .iter()
            .filter(|r| &r.key == key)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FavoriteStore for MemoryStorage {
    async fn touch(&self, key: &NovelKey, update_at: DateTime<Utc>) -> Result<usize> {
        let mut favorites = self.favorites.write().await;
        let mut touched = 0;
        for entry in favorites.iter_mut().filter(|e| &e.key == key) {
            entry.update_at = update_at;
            touched += 1;
        }
        Ok(touched)
    }
}
