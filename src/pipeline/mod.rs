//! Pure sync algorithms.
//!
//! - `staleness`: decide whether a stored record should be refetched
//! - `merge`: reconcile a remote toc against the stored one
//! - `index`: search index projection of stored novels

pub mod index;
pub mod merge;
pub mod staleness;

pub use index::{
    InMemoryIndex, IndexConfig, KindFilter, LevelFilter, SearchHits, SearchIndex, SearchQuery,
    SortOrder, TranslateFilter,
};
pub use merge::{MergeResult, ProviderTable, ReviewReason, TocMerger};
pub use staleness::StalenessPolicy;
