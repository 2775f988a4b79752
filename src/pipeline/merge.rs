// src/pipeline/merge.rs

//! Table-of-contents reconciliation.
//!
//! Merges a freshly fetched toc against the stored one, carrying translated
//! titles forward, and decides whether the change is structural and whether
//! a human should review it.
//!
//! The structural merge is the same for every provider: the output is the
//! remote toc in remote order, and each item takes the translated title of
//! the first stored item with the same original title. Divergence detection
//! depends on whether the provider's chapter ids are durable.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::{AppError, Result};
use crate::models::{IdStability, ProviderInfo, TocItem};

/// Why a reconciliation needs human review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewReason {
    /// Stable ids: some stored chapter ids vanished upstream
    ChaptersDeleted,
    /// Unstable ids: upstream has fewer chapters than stored
    UnknownChaptersDeleted,
    /// Unstable ids: a chapter id kept its slot but changed title
    ChapterTitleChanged,
}

impl ReviewReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewReason::ChaptersDeleted => "chapters deleted",
            ReviewReason::UnknownChaptersDeleted => "unknown chapters deleted",
            ReviewReason::ChapterTitleChanged => "chapter title changed",
        }
    }
}

impl fmt::Display for ReviewReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of merging a remote toc into a stored one.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeResult {
    /// Replaces the stored toc unconditionally
    pub toc: Vec<TocItem>,
    /// Gates timestamp stamping and favorites fanout
    pub has_changed: bool,
    /// Set when the change must be logged for review
    pub review_reason: Option<ReviewReason>,
}

/// Static map from provider id to chapter id stability.
#[derive(Debug, Clone, Default)]
pub struct ProviderTable {
    stability: HashMap<String, IdStability>,
}

impl ProviderTable {
    pub fn new(providers: &[ProviderInfo]) -> Self {
        Self {
            stability: providers
                .iter()
                .map(|p| (p.id.clone(), p.id_stability))
                .collect(),
        }
    }

    /// Stability class of a provider; unknown providers are stable.
    pub fn stability(&self, provider_id: &str) -> IdStability {
        match self.stability.get(provider_id) {
            Some(stability) => *stability,
            None => {
                log::debug!("Provider '{}' not configured, assuming stable ids", provider_id);
                IdStability::Stable
            }
        }
    }
}

/// Reconciles toc snapshots for one provider class.
#[derive(Debug, Clone, Copy)]
pub struct TocMerger {
    stability: IdStability,
}

impl TocMerger {
    pub fn new(stability: IdStability) -> Self {
        Self { stability }
    }

    /// Merge `remote` against `local`.
    ///
    /// Fails when the merged toc would hold a duplicate chapter id.
    pub fn merge(&self, remote: &[TocItem], local: &[TocItem]) -> Result<MergeResult> {
        let toc = simple_merge_toc(remote, local);
        ensure_unique_chapter_ids(&toc)?;

        let (has_changed, review_reason) = match self.stability {
            IdStability::Stable => detect_stable(remote, local),
            IdStability::Unstable => detect_unstable(remote, local),
        };

        Ok(MergeResult {
            toc,
            has_changed,
            review_reason,
        })
    }
}

/// Remote toc in remote order, with translated titles carried forward.
///
/// Matching is by original title and the first stored match wins. Matched
/// stored items stay in the candidate pool, so duplicated remote titles all
/// copy from the same stored item.
pub fn simple_merge_toc(remote: &[TocItem], local: &[TocItem]) -> Vec<TocItem> {
    let mut first_by_title: HashMap<&str, &TocItem> = HashMap::new();
    for item in local {
        first_by_title
            .entry(item.title_original.as_str())
            .or_insert(item);
    }

    remote
        .iter()
        .map(|item| TocItem {
            title_translated: first_by_title
                .get(item.title_original.as_str())
                .and_then(|old| old.title_translated.clone()),
            ..item.clone()
        })
        .collect()
}

/// Reject a toc in which a non-null chapter id appears twice.
pub fn ensure_unique_chapter_ids(toc: &[TocItem]) -> Result<()> {
    let mut seen = HashSet::new();
    for id in toc.iter().filter_map(|item| item.chapter_id.as_deref()) {
        if !seen.insert(id) {
            return Err(AppError::consistency(format!(
                "chapter id '{}' appears more than once in toc",
                id
            )));
        }
    }
    Ok(())
}

fn chapter_ids(toc: &[TocItem]) -> HashSet<&str> {
    toc.iter().filter_map(|item| item.chapter_id.as_deref()).collect()
}

fn id_to_title(toc: &[TocItem]) -> HashMap<&str, &str> {
    toc.iter()
        .filter_map(|item| {
            item.chapter_id
                .as_deref()
                .map(|id| (id, item.title_original.as_str()))
        })
        .collect()
}

fn detect_stable(remote: &[TocItem], local: &[TocItem]) -> (bool, Option<ReviewReason>) {
    let remote_ids = chapter_ids(remote);
    let local_ids = chapter_ids(local);

    let none_deleted = local_ids.is_subset(&remote_ids);
    let none_added = remote_ids.is_subset(&local_ids);

    let reason = (!none_deleted).then_some(ReviewReason::ChaptersDeleted);
    (!(none_added && none_deleted), reason)
}

fn detect_unstable(remote: &[TocItem], local: &[TocItem]) -> (bool, Option<ReviewReason>) {
    let remote_map = id_to_title(remote);
    let local_map = id_to_title(local);

    if remote_map.len() < local_map.len() {
        return (true, Some(ReviewReason::UnknownChaptersDeleted));
    }

    let title_changed = local_map.iter().any(|(id, local_title)| {
        remote_map
            .get(id)
            .is_some_and(|remote_title| remote_title != local_title)
    });

    (
        remote_map.len() != local_map.len(),
        title_changed.then_some(ReviewReason::ChapterTitleChanged),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, translated: Option<&str>, id: Option<&str>) -> TocItem {
        TocItem {
            title_original: title.to_string(),
            title_translated: translated.map(String::from),
            chapter_id: id.map(String::from),
            created_at: None,
        }
    }

    fn stable() -> TocMerger {
        TocMerger::new(IdStability::Stable)
    }

    fn unstable() -> TocMerger {
        TocMerger::new(IdStability::Unstable)
    }

    #[test]
    fn test_stable_pure_addition() {
        let local = vec![item("A", Some("甲"), Some("1")), item("B", None, Some("2"))];
        let remote = vec![
            item("A", None, Some("1")),
            item("B", None, Some("2")),
            item("C", None, Some("3")),
        ];

        let result = stable().merge(&remote, &local).unwrap();

        assert_eq!(
            result.toc,
            vec![
                item("A", Some("甲"), Some("1")),
                item("B", None, Some("2")),
                item("C", None, Some("3")),
            ]
        );
        assert!(result.has_changed);
        assert_eq!(result.review_reason, None);
    }

    #[test]
    fn test_stable_deletion() {
        let local = vec![item("A", Some("甲"), Some("1")), item("B", None, Some("2"))];
        let remote = vec![item("A", None, Some("1"))];

        let result = stable().merge(&remote, &local).unwrap();

        assert!(result.has_changed);
        assert_eq!(result.review_reason, Some(ReviewReason::ChaptersDeleted));
        assert_eq!(result.review_reason.unwrap().to_string(), "chapters deleted");
        assert_eq!(result.toc, vec![item("A", Some("甲"), Some("1"))]);
    }

    #[test]
    fn test_stable_rename_is_not_a_change() {
        let local = vec![item("A", Some("甲"), Some("1"))];
        let remote = vec![item("A (revised)", None, Some("1"))];

        let result = stable().merge(&remote, &local).unwrap();

        assert!(!result.has_changed);
        assert_eq!(result.review_reason, None);
        // Title no longer matches, so the translation is not carried
        assert_eq!(result.toc[0].title_translated, None);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let local = vec![
            item("Volume 1", Some("第一卷"), None),
            item("A", Some("甲"), Some("1")),
            item("B", None, Some("2")),
        ];
        let remote = vec![
            item("Volume 1", None, None),
            item("A", None, Some("1")),
            item("B", None, Some("2")),
            item("C", None, Some("3")),
        ];

        for merger in [stable(), unstable()] {
            let first = merger.merge(&remote, &local).unwrap();
            let second = merger.merge(&remote, &first.toc).unwrap();
            assert!(!second.has_changed);
            assert_eq!(second.review_reason, None);
            assert_eq!(second.toc, first.toc);
        }
    }

    #[test]
    fn test_merged_order_and_ids_follow_remote() {
        let local = vec![item("B", Some("乙"), Some("2")), item("A", Some("甲"), Some("1"))];
        let remote = vec![
            item("A", None, Some("1")),
            item("Header", None, None),
            item("B", None, Some("2")),
        ];

        let result = stable().merge(&remote, &local).unwrap();
        let titles: Vec<_> = result.toc.iter().map(|i| i.title_original.as_str()).collect();
        let ids: Vec<_> = result.toc.iter().map(|i| i.chapter_id.as_deref()).collect();

        assert_eq!(titles, vec!["A", "Header", "B"]);
        assert_eq!(ids, vec![Some("1"), None, Some("2")]);
        assert_eq!(result.toc[0].title_translated.as_deref(), Some("甲"));
        assert_eq!(result.toc[2].title_translated.as_deref(), Some("乙"));
    }

    #[test]
    fn test_duplicate_titles_share_first_match() {
        let local = vec![
            item("Extra", Some("番外一"), Some("1")),
            item("Extra", Some("番外二"), Some("2")),
        ];
        let remote = vec![item("Extra", None, Some("1")), item("Extra", None, Some("2"))];

        let result = stable().merge(&remote, &local).unwrap();

        assert_eq!(result.toc[0].title_translated.as_deref(), Some("番外一"));
        assert_eq!(result.toc[1].title_translated.as_deref(), Some("番外一"));
    }

    #[test]
    fn test_first_match_without_translation_is_not_skipped() {
        let local = vec![item("A", None, Some("1")), item("A", Some("甲"), Some("9"))];
        let remote = vec![item("A", None, Some("1"))];

        let result = stable().merge(&remote, &local).unwrap();
        assert_eq!(result.toc[0].title_translated, None);
    }

    #[test]
    fn test_unstable_fewer_chapters() {
        let local = vec![item("A", None, Some("1")), item("B", None, Some("2"))];
        // Same titles and ids, only the count dropped
        let remote = vec![item("A", None, Some("1"))];

        let result = unstable().merge(&remote, &local).unwrap();

        assert!(result.has_changed);
        assert_eq!(result.review_reason, Some(ReviewReason::UnknownChaptersDeleted));
    }

    #[test]
    fn test_unstable_addition_without_review() {
        let local = vec![item("A", None, Some("1"))];
        let remote = vec![item("A", None, Some("1")), item("B", None, Some("2"))];

        let result = unstable().merge(&remote, &local).unwrap();

        assert!(result.has_changed);
        assert_eq!(result.review_reason, None);
    }

    #[test]
    fn test_unstable_title_drift() {
        let local = vec![item("A", Some("甲"), Some("1")), item("B", None, Some("2"))];
        let remote = vec![item("A", None, Some("1")), item("B2", None, Some("2"))];

        let result = unstable().merge(&remote, &local).unwrap();

        assert!(!result.has_changed);
        assert_eq!(result.review_reason, Some(ReviewReason::ChapterTitleChanged));
    }

    #[test]
    fn test_unstable_regenerated_ids_same_size() {
        let local = vec![item("A", Some("甲"), Some("1")), item("B", None, Some("2"))];
        let remote = vec![item("A", None, Some("10")), item("B", None, Some("11"))];

        let result = unstable().merge(&remote, &local).unwrap();

        assert!(!result.has_changed);
        assert_eq!(result.review_reason, None);
        assert_eq!(result.toc[0].title_translated.as_deref(), Some("甲"));
    }

    #[test]
    fn test_duplicate_chapter_id_is_rejected() {
        let remote = vec![item("A", None, Some("1")), item("B", None, Some("1"))];
        let err = stable().merge(&remote, &[]).unwrap_err();
        assert!(matches!(err, AppError::Consistency(_)));
    }

    #[test]
    fn test_provider_table_lookup() {
        let table = ProviderTable::new(&[ProviderInfo {
            id: "syosetu".to_string(),
            id_stability: IdStability::Unstable,
        }]);
        assert_eq!(table.stability("syosetu"), IdStability::Unstable);
        assert_eq!(table.stability("somewhere"), IdStability::Stable);
    }
}
