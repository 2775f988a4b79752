//! Storage abstractions for novel persistence.
//!
//! Three collaborators share a backend:
//! - [`NovelStore`]: the authoritative novel records, keyed by provider and novel id
//! - [`ReviewLog`]: append-only log of reconciliations needing review
//! - [`FavoriteStore`]: users' saved-list entries and their freshness markers
//!
//! ## Directory Structure (filesystem backend)
//!
//! ```text
//! storage/
//! ├── novels/
//! │   └── {provider}/
//! │       └── {novel}.json  # One record per novel
//! ├── reviews.jsonl         # Review log, one JSON record per line
//! └── favorites.json        # Saved-list entries
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{NovelKey, NovelRecord, NovelUpdate, ReviewRecord};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Authoritative store of novel records.
#[async_trait]
pub trait NovelStore: Send + Sync {
    /// Point lookup by natural key.
    async fn find(&self, key: &NovelKey) -> Result<Option<NovelRecord>>;

    /// Insert a new record.
    ///
    /// Fails with `AppError::Duplicate` if the key is already stored.
    async fn insert(&self, record: &NovelRecord) -> Result<()>;

    /// Apply a field set atomically, returning the post-update image.
    ///
    /// Returns `None` if no record exists for the key.
    async fn update(&self, key: &NovelKey, update: NovelUpdate) -> Result<Option<NovelRecord>>;

    /// All stored records, used to rebuild projections.
    async fn list(&self) -> Result<Vec<NovelRecord>>;
}

/// Append-only review log.
#[async_trait]
pub trait ReviewLog: Send + Sync {
    async fn append(&self, record: &ReviewRecord) -> Result<()>;

    /// Review records for one novel, oldest first.
    async fn list_for(&self, key: &NovelKey) -> Result<Vec<ReviewRecord>>;
}

/// Saved-list freshness markers.
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    /// Set `update_at` on every saved-list entry referencing `key`.
    ///
    /// Returns the number of entries touched.
    async fn touch(&self, key: &NovelKey, update_at: DateTime<Utc>) -> Result<usize>;
}
