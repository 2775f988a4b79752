//! Search index projection of stored novels.
//!
//! The index is an eventually consistent, denormalized projection of the
//! novel store. It answers queries with ordered natural keys and a total
//! count; callers resolve the keys against the store for content.
//!
//! [`InMemoryIndex`] keeps an inverted index from normalized tokens to
//! novel keys, built from titles, authors and keywords.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;
use crate::models::{NovelKey, NovelKind, NovelRecord};

/// Kind filter for search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindFilter {
    #[default]
    All,
    Serializing,
    Completed,
    ShortStory,
}

impl KindFilter {
    fn accepts(&self, kind: Option<NovelKind>) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Serializing => kind == Some(NovelKind::Serializing),
            KindFilter::Completed => kind == Some(NovelKind::Completed),
            KindFilter::ShortStory => kind == Some(NovelKind::ShortStory),
        }
    }
}

/// Content level filter for search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelFilter {
    #[default]
    All,
    General,
    R18,
}

/// Translation availability filter for search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslateFilter {
    #[default]
    All,
    Gpt,
    Sakura,
}

/// Result ordering for search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    UpdateAt,
    Visits,
    Relevance,
}

/// A search request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free text; empty matches everything
    #[serde(default)]
    pub text: Option<String>,

    /// Restrict to these providers; empty means all
    #[serde(default)]
    pub providers: Vec<String>,

    #[serde(default)]
    pub kind: KindFilter,

    #[serde(default)]
    pub level: LevelFilter,

    #[serde(default)]
    pub translate: TranslateFilter,

    #[serde(default)]
    pub sort: SortOrder,

    /// Zero-based page number
    #[serde(default)]
    pub page: usize,

    #[serde(default)]
    pub page_size: usize,
}

/// Ordered keys for one page plus the total hit count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHits {
    pub keys: Vec<NovelKey>,
    pub total: u64,
}

/// Write side and query side of the search index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Reflect the full record into the index.
    async fn sync_full(&self, novel: &NovelRecord) -> Result<()>;

    /// Reflect only the visit counter of an already indexed record.
    async fn sync_counter(&self, novel: &NovelRecord) -> Result<()>;

    /// Run a query, returning one page of keys.
    async fn search(&self, query: &SearchQuery) -> Result<SearchHits>;
}

/// Configuration for tokenization.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Minimum token length in bytes (default: 2)
    pub min_token_length: usize,
    /// Maximum tokens per novel (default: 200)
    pub max_tokens_per_novel: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            min_token_length: 2,
            max_tokens_per_novel: 200,
        }
    }
}

#[derive(Debug, Clone)]
struct IndexedNovel {
    title_tokens: HashSet<String>,
    tokens: HashSet<String>,
    kind: Option<NovelKind>,
    r18: bool,
    gpt: u64,
    sakura: u64,
    visit_count: u64,
    update_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct IndexState {
    docs: HashMap<NovelKey, IndexedNovel>,
    postings: HashMap<String, HashSet<NovelKey>>,
}

impl IndexState {
    fn upsert(&mut self, config: &IndexConfig, novel: &NovelRecord) {
        self.remove(&novel.key);

        let mut title_tokens: HashSet<String> = tokenize(config, &novel.remote.title_original)
            .into_iter()
            .collect();
        if let Some(title) = &novel.translation.title_translated {
            title_tokens.extend(tokenize(config, title));
        }

        let mut tokens: Vec<String> = title_tokens.iter().cloned().collect();
        for author in &novel.authors {
            tokens.extend(tokenize(config, &author.name));
        }
        for keyword in &novel.remote.keywords {
            tokens.extend(tokenize(config, keyword));
        }
        tokens.truncate(config.max_tokens_per_novel);
        let tokens: HashSet<String> = tokens.into_iter().collect();

        for token in &tokens {
            self.postings
                .entry(token.clone())
                .or_default()
                .insert(novel.key.clone());
        }

        self.docs.insert(
            novel.key.clone(),
            IndexedNovel {
                title_tokens,
                tokens,
                kind: novel.remote.kind,
                r18: novel.is_r18(),
                gpt: novel.translation.counts.gpt,
                sakura: novel.translation.counts.sakura,
                visit_count: novel.visit_count,
                update_at: novel.update_at,
            },
        );
    }

    fn remove(&mut self, key: &NovelKey) {
        let Some(doc) = self.docs.remove(key) else {
            return;
        };
        for token in &doc.tokens {
            if let Some(keys) = self.postings.get_mut(token) {
                keys.remove(key);
                if keys.is_empty() {
                    self.postings.remove(token);
                }
            }
        }
    }

    fn candidates(&self, query_tokens: &[String]) -> Vec<&NovelKey> {
        if query_tokens.is_empty() {
            return self.docs.keys().collect();
        }

        let mut sets = query_tokens.iter().map(|t| self.postings.get(t));
        let Some(Some(first)) = sets.next() else {
            return Vec::new();
        };
        let mut result: HashSet<&NovelKey> = first.iter().collect();
        for set in sets {
            match set {
                Some(keys) => result.retain(|k| keys.contains(*k)),
                None => return Vec::new(),
            }
        }
        result.into_iter().collect()
    }
}

/// In-process search index.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    config: IndexConfig,
    state: RwLock<IndexState>,
}

impl InMemoryIndex {
    /// Create an empty index with default configuration.
    pub fn new() -> Self {
        Self::with_config(IndexConfig::default())
    }

    /// Create an empty index with custom configuration.
    pub fn with_config(config: IndexConfig) -> Self {
        Self {
            config,
            state: RwLock::new(IndexState::default()),
        }
    }

    /// Build an index from existing records.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a NovelRecord>) -> Self {
        let config = IndexConfig::default();
        let mut state = IndexState::default();
        for record in records {
            state.upsert(&config, record);
        }
        Self {
            config,
            state: RwLock::new(state),
        }
    }

    /// Number of indexed novels.
    pub async fn len(&self) -> usize {
        self.state.read().await.docs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SearchIndex for InMemoryIndex {
    async fn sync_full(&self, novel: &NovelRecord) -> Result<()> {
        self.state.write().await.upsert(&self.config, novel);
        Ok(())
    }

    async fn sync_counter(&self, novel: &NovelRecord) -> Result<()> {
        let mut state = self.state.write().await;
        match state.docs.get_mut(&novel.key) {
            Some(doc) => doc.visit_count = novel.visit_count,
            None => log::debug!("Visit sync for unindexed novel {}", novel.key),
        }
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchHits> {
        let query_tokens = query
            .text
            .as_deref()
            .map(|text| tokenize(&self.config, text))
            .unwrap_or_default();

        // Text that reduces to nothing matches nothing
        let has_text = query.text.as_deref().is_some_and(|t| !t.trim().is_empty());
        if has_text && query_tokens.is_empty() {
            return Ok(SearchHits::default());
        }

        let state = self.state.read().await;
        let mut hits: Vec<(&NovelKey, &IndexedNovel, usize)> = state
            .candidates(&query_tokens)
            .into_iter()
            .filter_map(|key| state.docs.get(key).map(|doc| (key, doc)))
            .filter(|(key, doc)| matches_filters(query, key, doc))
            .map(|(key, doc)| (key, doc, relevance(&query_tokens, doc)))
            .collect();

        hits.sort_by(|(ka, a, sa), (kb, b, sb)| {
            let primary = match query.sort {
                SortOrder::UpdateAt => b.update_at.cmp(&a.update_at),
                SortOrder::Visits => b.visit_count.cmp(&a.visit_count),
                SortOrder::Relevance => sb.cmp(sa),
            };
            primary
                .then_with(|| b.update_at.cmp(&a.update_at))
                .then_with(|| ka.cmp(kb))
        });

        let total = hits.len() as u64;
        let keys = hits
            .into_iter()
            .skip(query.page.saturating_mul(query.page_size))
            .take(query.page_size)
            .map(|(key, _, _)| key.clone())
            .collect();

        Ok(SearchHits { keys, total })
    }
}

fn matches_filters(query: &SearchQuery, key: &NovelKey, doc: &IndexedNovel) -> bool {
    if !query.providers.is_empty() && !query.providers.contains(&key.provider_id) {
        return false;
    }
    if !query.kind.accepts(doc.kind) {
        return false;
    }
    let level_ok = match query.level {
        LevelFilter::All => true,
        LevelFilter::General => !doc.r18,
        LevelFilter::R18 => doc.r18,
    };
    let translate_ok = match query.translate {
        TranslateFilter::All => true,
        TranslateFilter::Gpt => doc.gpt > 0,
        TranslateFilter::Sakura => doc.sakura > 0,
    };
    level_ok && translate_ok
}

/// Title hits weigh double.
fn relevance(query_tokens: &[String], doc: &IndexedNovel) -> usize {
    query_tokens
        .iter()
        .map(|t| if doc.title_tokens.contains(t) { 2 } else { 1 })
        .sum()
}

/// Tokenize a string into normalized keywords.
fn tokenize(config: &IndexConfig, text: &str) -> Vec<String> {
    let normalized = text.to_lowercase();

    normalized
        .unicode_words()
        .filter(|word| word.len() >= config.min_token_length)
        .filter(|word| !is_stopword(word))
        .map(String::from)
        .collect()
}

/// Check if a word is a common stopword (Japanese particles/English).
fn is_stopword(word: &str) -> bool {
    const STOPWORDS: &[&str] = &[
        // Japanese particles that survive segmentation as standalone words
        "の", "は", "が", "を", "に", "で", "と", "も",
        // English common words
        "the", "is", "are", "was", "were", "be", "been", "of", "to", "in", "for", "on", "with",
        "at", "by", "from", "as", "or", "and", "but",
    ];
    STOPWORDS.contains(&word)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::{Attention, Author, RemoteSnapshot};

    fn novel(provider: &str, id: &str, title: &str, age_hours: i64) -> NovelRecord {
        let snapshot = RemoteSnapshot {
            title: title.to_string(),
            authors: vec![Author {
                name: "Sorcerer Pen".to_string(),
                link: None,
            }],
            kind: Some(NovelKind::Serializing),
            keywords: vec!["fantasy".to_string()],
            attentions: vec![],
            points: None,
            total_characters: None,
            introduction: String::new(),
            toc: vec![],
        };
        snapshot.into_record(
            NovelKey::new(provider, id),
            Utc::now() - Duration::hours(age_hours),
        )
    }

    fn query(text: &str) -> SearchQuery {
        SearchQuery {
            text: Some(text.to_string()),
            page_size: 10,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_stopword_only_query_matches_nothing() {
        let index = InMemoryIndex::new();
        index.sync_full(&novel("kakuyomu", "1", "The Dragon", 1)).await.unwrap();

        for text in ["the", "の", "of the"] {
            let hits = index.search(&query(text)).await.unwrap();
            assert!(hits.keys.is_empty(), "{text} should match nothing");
            assert_eq!(hits.total, 0);
        }

        let all = index.search(&query("  ")).await.unwrap();
        assert_eq!(all.total, 1);
    }

    #[tokio::test]
    async fn test_text_search_matches_all_tokens() {
        let index = InMemoryIndex::new();
        index.sync_full(&novel("kakuyomu", "1", "Dragon Academy", 1)).await.unwrap();
        index.sync_full(&novel("kakuyomu", "2", "Dragon Village", 2)).await.unwrap();

        let hits = index.search(&query("dragon academy")).await.unwrap();
        assert_eq!(hits.total, 1);
        assert_eq!(hits.keys, vec![NovelKey::new("kakuyomu", "1")]);

        let hits = index.search(&query("dragon")).await.unwrap();
        assert_eq!(hits.total, 2);
        // Default order is most recently updated first
        assert_eq!(hits.keys[0], NovelKey::new("kakuyomu", "1"));
    }

    #[tokio::test]
    async fn test_resync_replaces_tokens() {
        let index = InMemoryIndex::new();
        let mut record = novel("syosetu", "n1", "Old Name", 1);
        index.sync_full(&record).await.unwrap();

        record.remote.title_original = "Brand New".to_string();
        index.sync_full(&record).await.unwrap();

        assert_eq!(index.search(&query("old")).await.unwrap().total, 0);
        assert_eq!(index.search(&query("brand")).await.unwrap().total, 1);
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn test_filters() {
        let mut r18 = novel("hameln", "1", "Night Story", 1);
        r18.remote.attentions = vec![Attention::R18];
        let mut translated = novel("kakuyomu", "2", "Day Story", 2);
        translated.translation.counts.sakura = 3;

        let index = InMemoryIndex::from_records([&r18, &translated]);

        let mut q = query("story");
        q.level = LevelFilter::R18;
        assert_eq!(index.search(&q).await.unwrap().keys, vec![r18.key.clone()]);

        let mut q = query("story");
        q.translate = TranslateFilter::Sakura;
        assert_eq!(index.search(&q).await.unwrap().keys, vec![translated.key.clone()]);

        let mut q = query("story");
        q.providers = vec!["hameln".to_string()];
        assert_eq!(index.search(&q).await.unwrap().total, 1);

        let mut q = query("story");
        q.kind = KindFilter::Completed;
        assert_eq!(index.search(&q).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_sort_by_visits_and_paging() {
        let mut a = novel("kakuyomu", "a", "Tale One", 1);
        let mut b = novel("kakuyomu", "b", "Tale Two", 2);
        let c = novel("kakuyomu", "c", "Tale Three", 3);
        a.visit_count = 1;
        b.visit_count = 50;

        let index = InMemoryIndex::from_records([&a, &b, &c]);
        let mut q = query("tale");
        q.sort = SortOrder::Visits;
        q.page_size = 2;

        let first = index.search(&q).await.unwrap();
        assert_eq!(first.total, 3);
        assert_eq!(first.keys, vec![b.key.clone(), a.key.clone()]);

        q.page = 1;
        let second = index.search(&q).await.unwrap();
        assert_eq!(second.keys, vec![c.key.clone()]);
    }

    #[tokio::test]
    async fn test_sync_counter_updates_visits_only() {
        let mut a = novel("kakuyomu", "a", "Tale", 1);
        let b = novel("kakuyomu", "b", "Tale", 1);
        let index = InMemoryIndex::from_records([&a, &b]);

        a.visit_count = 10;
        a.remote.title_original = "Ignored".to_string();
        index.sync_counter(&a).await.unwrap();

        let mut q = query("tale");
        q.sort = SortOrder::Visits;
        let hits = index.search(&q).await.unwrap();
        assert_eq!(hits.keys[0], a.key);
        assert_eq!(index.search(&query("ignored")).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_author_and_keyword_tokens() {
        let index = InMemoryIndex::from_records([&novel("pixiv", "1", "Untitled", 1)]);
        assert_eq!(index.search(&query("sorcerer")).await.unwrap().total, 1);
        assert_eq!(index.search(&query("fantasy")).await.unwrap().total, 1);
    }

    #[test]
    fn test_stopword_filtering() {
        let tokens = tokenize(&IndexConfig::default(), "The Tale of Swords");
        assert_eq!(tokens, vec!["tale".to_string(), "swords".to_string()]);
    }
}
