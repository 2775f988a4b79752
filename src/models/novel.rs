// src/models/novel.rs

//! Stored novel record and its table of contents.
//!
//! A record is split into two field groups: [`RemoteFields`] is owned by the
//! upstream source and replaced wholesale on every sync, while
//! [`Translation`] is owned by translators and translation pipelines and is
//! never rebuilt from a snapshot.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Natural key of a novel: the provider plus the provider's own novel id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NovelKey {
    pub provider_id: String,
    pub novel_id: String,
}

impl NovelKey {
    pub fn new(provider_id: impl Into<String>, novel_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            novel_id: novel_id.into(),
        }
    }
}

impl fmt::Display for NovelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider_id, self.novel_id)
    }
}

/// Author credited by the upstream source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Publication state reported by the upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NovelKind {
    Serializing,
    Completed,
    ShortStory,
}

/// Content warning tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Attention {
    #[serde(rename = "R15")]
    R15,
    #[serde(rename = "R18")]
    R18,
    #[serde(rename = "cruelty")]
    Cruelty,
    #[serde(rename = "violence")]
    Violence,
    #[serde(rename = "sexual_content")]
    SexualContent,
}

/// One entry of a table of contents.
///
/// Entries without a `chapter_id` are structural headers such as volume titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocItem {
    /// Upstream title, also the join key when carrying translations forward
    pub title_original: String,

    #[serde(default)]
    pub title_translated: Option<String>,

    #[serde(default)]
    pub chapter_id: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl TocItem {
    /// Whether this entry is a readable chapter rather than a header.
    pub fn is_chapter(&self) -> bool {
        self.chapter_id.is_some()
    }
}

/// Translation pipelines that keep per-novel chapter counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranslatorEngine {
    Baidu,
    Youdao,
    Gpt,
    Crowd,
    Sakura,
}

/// Completed chapter counts per translation pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineCounts {
    #[serde(default)]
    pub baidu: u64,
    #[serde(default)]
    pub youdao: u64,
    #[serde(default)]
    pub gpt: u64,
    #[serde(default)]
    pub crowd: u64,
    #[serde(default)]
    pub sakura: u64,
}

impl EngineCounts {
    pub fn set(&mut self, engine: TranslatorEngine, count: u64) {
        let slot = match engine {
            TranslatorEngine::Baidu => &mut self.baidu,
            TranslatorEngine::Youdao => &mut self.youdao,
            TranslatorEngine::Gpt => &mut self.gpt,
            TranslatorEngine::Crowd => &mut self.crowd,
            TranslatorEngine::Sakura => &mut self.sakura,
        };
        *slot = count;
    }
}

/// Fields derived from the upstream snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFields {
    pub title_original: String,

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
    pub introduction_original: String,
}

/// Fields owned by translators and translation pipelines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    #[serde(default)]
    pub title_translated: Option<String>,

    #[serde(default)]
    pub introduction_translated: Option<String>,

    #[serde(default)]
    pub glossary: BTreeMap<String, String>,

    /// Regenerated on every glossary replacement
    #[serde(default)]
    pub glossary_version: Option<String>,

    #[serde(default)]
    pub counts: EngineCounts,
}

/// The authoritative stored novel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NovelRecord {
    #[serde(flatten)]
    pub key: NovelKey,

    #[serde(default)]
    pub authors: Vec<Author>,

    #[serde(flatten)]
    pub remote: RemoteFields,

    #[serde(flatten)]
    pub translation: Translation,

    /// Reading order; always the most recent upstream order
    #[serde(default)]
    pub toc: Vec<TocItem>,

    #[serde(default)]
    pub visit_count: u64,

    /// Freezes structural sync while set
    #[serde(default)]
    pub pause_update: bool,

    pub sync_at: DateTime<Utc>,
    pub change_at: DateTime<Utc>,
    pub update_at: DateTime<Utc>,

    /// Cross-reference to a separate catalog entry
    #[serde(default)]
    pub catalog_id: Option<String>,
}

impl NovelRecord {
    /// Number of readable chapters in the toc.
    pub fn chapter_count(&self) -> usize {
        self.toc.iter().filter(|item| item.is_chapter()).count()
    }

    pub fn is_r18(&self) -> bool {
        self.remote.attentions.contains(&Attention::R18)
    }
}
