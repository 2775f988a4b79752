// src/models/review.rs

//! Human review log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{NovelKey, TocItem};

/// A reconciliation that needs a human to look at it.
///
/// Append-only: nothing in this crate mutates or deletes one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    #[serde(flatten)]
    pub key: NovelKey,

    /// Stored toc before the merge
    pub toc_before: Vec<TocItem>,

    /// Merged toc that replaced it
    pub toc_after: Vec<TocItem>,

    pub reason: String,

    pub created_at: DateTime<Utc>,
}
