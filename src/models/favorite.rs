// src/models/favorite.rs

//! Saved-list entries referencing a novel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::NovelKey;

/// One user's saved-list entry for a novel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub user_id: String,

    #[serde(flatten)]
    pub key: NovelKey,

    pub created_at: DateTime<Utc>,

    /// Last content change of the novel, drives "updated" markers
    pub update_at: DateTime<Utc>,
}
