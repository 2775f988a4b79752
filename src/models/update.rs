// src/models/update.rs

//! Field-level updates applied atomically by a novel store.
//!
//! Every variant touches a disjoint slice of [`NovelRecord`]. The sync variant
//! can only carry the remote-derived group, so a reconciliation can never
//! write translator-owned fields.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::{Author, NovelRecord, RemoteFields, TocItem, TranslatorEngine};

/// Result of reconciling a snapshot, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncUpdate {
    pub authors: Vec<Author>,
    pub remote: RemoteFields,
    pub toc: Vec<TocItem>,
    pub sync_at: DateTime<Utc>,
    /// Set only when the toc changed structurally
    pub changed_at: Option<DateTime<Utc>>,
}

/// Translator edits to titles and introduction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationPatch {
    pub title: Option<String>,
    pub introduction: Option<String>,
    /// Toc index to translated title; `None` clears the translation
    pub toc: BTreeMap<usize, Option<String>>,
}

/// An atomic field set.
#[derive(Debug, Clone, PartialEq)]
pub enum NovelUpdate {
    Sync(SyncUpdate),
    Translation {
        patch: TranslationPatch,
        changed_at: DateTime<Utc>,
    },
    Glossary {
        glossary: BTreeMap<String, String>,
        version: String,
    },
    EngineCount {
        engine: TranslatorEngine,
        count: u64,
    },
    CatalogRef(Option<String>),
    PauseUpdate(bool),
    IncrementVisits,
}

impl NovelUpdate {
    /// Apply this field set to a record in place.
    pub fn apply(self, record: &mut NovelRecord) {
        match self {
            NovelUpdate::Sync(update) => {
                record.authors = update.authors;
                record.remote = update.remote;
                record.toc = update.toc;
                record.sync_at = update.sync_at;
                if let Some(at) = update.changed_at {
                    record.change_at = at;
                    record.update_at = at;
                }
            }
            NovelUpdate::Translation { patch, changed_at } => {
                record.translation.title_translated = patch.title;
                record.translation.introduction_translated = patch.introduction;
                for (index, title) in patch.toc {
                    // Out-of-range indices are ignored, the toc may have moved on
                    if let Some(item) = record.toc.get_mut(index) {
                        item.title_translated = title;
                    }
                }
                record.change_at = changed_at;
            }
            NovelUpdate::Glossary { glossary, version } => {
                record.translation.glossary = glossary;
                record.translation.glossary_version = Some(version);
            }
            NovelUpdate::EngineCount { engine, count } => {
                record.translation.counts.set(engine, count);
            }
            NovelUpdate::CatalogRef(catalog_id) => record.catalog_id = catalog_id,
            NovelUpdate::PauseUpdate(paused) => record.pause_update = paused,
            NovelUpdate::IncrementVisits => record.visit_count += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::{NovelKey, RemoteSnapshot, RemoteTocItem};

    fn base_record() -> NovelRecord {
        let snapshot = RemoteSnapshot {
            title: "old".to_string(),
            authors: vec![],
            kind: None,
            keywords: vec![],
            attentions: vec![],
            points: None,
            total_characters: None,
            introduction: String::new(),
            toc: vec![RemoteTocItem {
                title: "A".to_string(),
                chapter_id: Some("1".to_string()),
                created_at: None,
            }],
        };
        let mut record = snapshot.into_record(NovelKey::new("pixiv", "9"), Utc::now() - Duration::days(2));
        record.translation.title_translated = Some("旧".to_string());
        record
    }

    #[test]
    fn test_sync_keeps_translation_group() {
        let mut record = base_record();
        let before_change = record.change_at;
        let now = Utc::now();
        let mut remote = record.remote.clone();
        remote.title_original = "new".to_string();

        NovelUpdate::Sync(SyncUpdate {
            authors: record.authors.clone(),
            remote,
            toc: record.toc.clone(),
            sync_at: now,
            changed_at: None,
        })
        .apply(&mut record);

        assert_eq!(record.remote.title_original, "new");
        assert_eq!(record.translation.title_translated.as_deref(), Some("旧"));
        assert_eq!(record.sync_at, now);
        assert_eq!(record.change_at, before_change);
    }

    #[test]
    fn test_translation_patch_ignores_out_of_range() {
        let mut record = base_record();
        let now = Utc::now();
        let patch = TranslationPatch {
            title: Some("新".to_string()),
            introduction: None,
            toc: BTreeMap::from([(0, Some("甲".to_string())), (7, Some("x".to_string()))]),
        };

        NovelUpdate::Translation { patch, changed_at: now }.apply(&mut record);

        assert_eq!(record.toc[0].title_translated.as_deref(), Some("甲"));
        assert_eq!(record.toc.len(), 1);
        assert_eq!(record.change_at, now);
    }
}
