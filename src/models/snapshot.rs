// src/models/snapshot.rs

//! Upstream snapshots as returned by a remote source.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Attention, Author, NovelKey, NovelKind, NovelRecord, RemoteFields, TocItem, Translation};

/// Table of contents entry as the upstream source reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTocItem {
    pub title: String,

    #[serde(default)]
    pub chapter_id: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Point-in-time capture of a novel's metadata and toc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSnapshot {
    pub title: String,

    #[serde(default)]
    pub authors: Vec<Author>,

    #[serde(default)]
    pub kind: Option<NovelKind>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub attentions: Vec<Attention>,

    #[serde(default)]
    pub points: Option<u64>,

    #[serde(default)]
    pub total_characters: Option<u64>,

    #[serde(default)]
    pub introduction: String,

    #[serde(default)]
    pub toc: Vec<RemoteTocItem>,
}

impl RemoteSnapshot {
    /// Remote-derived field group of this snapshot.
    pub fn remote_fields(&self) -> RemoteFields {
        RemoteFields {
            title_original: self.title.clone(),
            kind: self.kind,
            keywords: self.keywords.clone(),
            attentions: self.attentions.clone(),
            points: self.points,
            total_characters: self.total_characters,
            introduction_original: self.introduction.clone(),
        }
    }

    /// Snapshot toc as stored items with no translations attached.
    pub fn toc_items(&self) -> Vec<TocItem> {
        self.toc
            .iter()
            .map(|item| TocItem {
                title_original: item.title.clone(),
                title_translated: None,
                chapter_id: item.chapter_id.clone(),
                created_at: item.created_at,
            })
            .collect()
    }

    /// Build a fresh record for a key seen for the first time.
    pub fn into_record(self, key: NovelKey, now: DateTime<Utc>) -> NovelRecord {
        NovelRecord {
            key,
            remote: self.remote_fields(),
            toc: self.toc_items(),
            authors: self.authors,
            translation: Translation::default(),
            visit_count: 0,
            pause_update: false,
            sync_at: now,
            change_at: now,
            update_at: now,
            catalog_id: None,
        }
    }
}

/// One entry of an upstream ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankItem {
    pub novel_id: String,
    pub title: String,

    #[serde(default)]
    pub attentions: Vec<Attention>,

    #[serde(default)]
    pub keywords: Vec<String>,

    /// Provider-specific display text (e.g. "3 chapters / 12k chars")
    #[serde(default)]
    pub extra: Option<String>,
}

/// Provider-specific ranking options such as genre or period.
pub type RankOptions = BTreeMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_record_starts_untranslated() {
        let snapshot = RemoteSnapshot {
            title: "タイトル".to_string(),
            authors: vec![],
            kind: Some(NovelKind::Completed),
            keywords: vec![],
            attentions: vec![Attention::R18],
            points: Some(5),
            total_characters: None,
            introduction: "紹介".to_string(),
            toc: vec![RemoteTocItem {
                title: "第1話".to_string(),
                chapter_id: Some("1".to_string()),
                created_at: None,
            }],
        };
        let now = Utc::now();
        let record = snapshot.into_record(NovelKey::new("novelup", "42"), now);

        assert_eq!(record.remote.title_original, "タイトル");
        assert!(record.translation.title_translated.is_none());
        assert!(record.toc[0].title_translated.is_none());
        assert_eq!(record.visit_count, 0);
        assert_eq!(record.sync_at, now);
        assert!(record.is_r18());
    }

    #[test]
    fn test_snapshot_defaults_on_sparse_json() {
        let snapshot: RemoteSnapshot =
            serde_json::from_str(r#"{"title":"t","toc":[{"title":"vol 1"}]}"#).unwrap();
        assert!(snapshot.toc[0].chapter_id.is_none());
        assert!(snapshot.kind.is_none());
    }
}
