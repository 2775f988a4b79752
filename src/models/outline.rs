//! List entries returned by ranking and search.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Attention, EngineCounts, NovelKind, NovelRecord, RankItem};

/// Compact view of a novel for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NovelOutline {
    pub provider_id: String,
    pub novel_id: String,
    pub title_original: String,
    pub title_translated: Option<String>,
    pub kind: Option<NovelKind>,
    pub attentions: Vec<Attention>,
    pub keywords: Vec<String>,
    pub extra: Option<String>,
    /// Readable chapters in the stored toc
    pub total: u64,
    pub counts: EngineCounts,
    pub update_at: Option<DateTime<Utc>>,
}

impl NovelOutline {
    /// Decorate an upstream ranking entry with whatever is stored locally.
    pub fn from_rank(provider_id: &str, item: RankItem, local: Option<&NovelRecord>) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            novel_id: item.novel_id,
            title_original: item.title,
            title_translated: local.and_then(|n| n.translation.title_translated.clone()),
            kind: None,
            attentions: item.attentions,
            keywords: item.keywords,
            extra: item.extra,
            total: local.map(|n| n.chapter_count() as u64).unwrap_or(0),
            counts: local.map(|n| n.translation.counts).unwrap_or_default(),
            update_at: local.map(|n| n.update_at),
        }
    }
}

impl From<&NovelRecord> for NovelOutline {
    fn from(novel: &NovelRecord) -> Self {
        Self {
            provider_id: novel.key.provider_id.clone(),
            novel_id: novel.key.novel_id.clone(),
            title_original: novel.remote.title_original.clone(),
            title_translated: novel.translation.title_translated.clone(),
            kind: novel.remote.kind,
            attentions: novel.remote.attentions.clone(),
            keywords: novel.remote.keywords.clone(),
            extra: None,
            total: novel.chapter_count() as u64,
            counts: novel.translation.counts,
            update_at: Some(novel.update_at),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page_size: usize,
}

impl<T> Page<T> {
    /// Number of pages needed to show `total` items.
    pub fn page_count(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_outline_without_local_record() {
        let item = RankItem {
            novel_id: "n0001".to_string(),
            title: "ランキング作品".to_string(),
            attentions: vec![],
            keywords: vec!["恋愛".to_string()],
            extra: Some("10話".to_string()),
        };
        let outline = NovelOutline::from_rank("syosetu", item, None);

        assert_eq!(outline.provider_id, "syosetu");
        assert!(outline.title_translated.is_none());
        assert_eq!(outline.total, 0);
        assert_eq!(outline.counts, EngineCounts::default());
        assert!(outline.update_at.is_none());
    }

    #[test]
    fn test_page_count() {
        let page: Page<()> = Page {
            items: vec![],
            total: 21,
            page_size: 10,
        };
        assert_eq!(page.page_count(), 3);
    }
}
