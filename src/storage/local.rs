//! Local filesystem storage implementation.
//!
//! Stores one JSON document per novel, the review log as JSON lines and the
//! saved-list entries as a single JSON array.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── novels/{provider}/{novel}.json
//! ├── reviews.jsonl
//! └── favorites.json
//! ```
//!
//! Documents are written atomically (temp file, then rename). Every
//! read-modify-write runs under one async mutex, so an interrupted update
//! leaves the previous document in place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{FavoriteEntry, NovelKey, NovelRecord, NovelUpdate, ReviewRecord};
use crate::storage::{FavoriteStore, NovelStore, ReviewLog};

const NOVELS_DIR: &str = "novels";
const REVIEWS_FILE: &str = "reviews.jsonl";
const FAVORITES_FILE: &str = "favorites.json";

/// Local filesystem storage backend.
pub struct LocalStorage {
    root_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Relative key of a novel document.
    fn novel_key(key: &NovelKey) -> Result<String> {
        check_segment(&key.provider_id)?;
        check_segment(&key.novel_id)?;
        Ok(format!("{}/{}/{}.json", NOVELS_DIR, key.provider_id, key.novel_id))
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        read_optional(&self.path(key)).await
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Add a saved-list entry.
    pub async fn add_favorite(&self, entry: FavoriteEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut favorites: Vec<FavoriteEntry> =
            self.read_json(FAVORITES_FILE).await?.unwrap_or_default();
        favorites.push(entry);
        self.write_json(FAVORITES_FILE, &favorites).await
    }

    /// All saved-list entries.
    pub async fn favorites(&self) -> Result<Vec<FavoriteEntry>> {
        Ok(self.read_json(FAVORITES_FILE).await?.unwrap_or_default())
    }
}

/// Reject ids that would escape their directory.
fn check_segment(segment: &str) -> Result<()> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\'])
    {
        return Err(AppError::validation(format!(
            "'{}' is not usable as a storage path segment",
            segment
        )));
    }
    Ok(())
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

#[async_trait]
impl NovelStore for LocalStorage {
    async fn find(&self, key: &NovelKey) -> Result<Option<NovelRecord>> {
        self.read_json(&Self::novel_key(key)?).await
    }

    async fn insert(&self, record: &NovelRecord) -> Result<()> {
        let doc = Self::novel_key(&record.key)?;
        let _guard = self.write_lock.lock().await;

        if tokio::fs::try_exists(self.path(&doc)).await? {
            return Err(AppError::Duplicate {
                key: record.key.clone(),
            });
        }
        self.write_json(&doc, record).await?;
        log::debug!("Inserted {} into {}", record.key, doc);
        Ok(())
    }

    async fn update(&self, key: &NovelKey, update: NovelUpdate) -> Result<Option<NovelRecord>> {
        let doc = Self::novel_key(key)?;
        let _guard = self.write_lock.lock().await;

        let Some(mut record) = self.read_json::<NovelRecord>(&doc).await? else {
            return Ok(None);
        };
        update.apply(&mut record);
        self.write_json(&doc, &record).await?;
        Ok(Some(record))
    }

    async fn list(&self) -> Result<Vec<NovelRecord>> {
        let novels_dir = self.path(NOVELS_DIR);
        let mut records = Vec::new();

        let mut providers = match tokio::fs::read_dir(&novels_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(AppError::Io(e)),
        };

        while let Some(provider) = providers.next_entry().await? {
            if !provider.file_type().await?.is_dir() {
                continue;
            }
            let mut files = tokio::fs::read_dir(provider.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                if let Some(bytes) = read_optional(&path).await? {
                    match serde_json::from_slice::<NovelRecord>(&bytes) {
                        Ok(record) => records.push(record),
                        Err(e) => log::warn!("Skipping unreadable {}: {}", path.display(), e),
                    }
                }
            }
        }

        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records)
    }
}

#[async_trait]
impl ReviewLog for LocalStorage {
    async fn append(&self, record: &ReviewRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let path = self.path(REVIEWS_FILE);
        let _guard = self.write_lock.lock().await;
        self.ensure_dir(&path).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn list_for(&self, key: &NovelKey) -> Result<Vec<ReviewRecord>> {
        let Some(bytes) = self.read_bytes(REVIEWS_FILE).await? else {
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        for line in bytes.split(|b| *b == b'\n').filter(|l| !l.is_empty()) {
            let record: ReviewRecord = serde_json::from_slice(line)?;
            if &record.key == key {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl FavoriteStore for LocalStorage {
    async fn touch(&self, key: &NovelKey, update_at: DateTime<Utc>) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let Some(mut favorites) = self.read_json::<Vec<FavoriteEntry>>(FAVORITES_FILE).await?
        else {
            return Ok(0);
        };

        let mut touched = 0;
        for entry in favorites.iter_mut().filter(|e| &e.key == key) {
            entry.update_at = update_at;
            touched += 1;
        }
        if touched > 0 {
            self.write_json(FAVORITES_FILE, &favorites).await?;
        }
        Ok(touched)
    }
}
