// src/models/mod.rs

//! Domain models for the sync engine.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod favorite;
mod novel;
mod outline;
mod review;
mod snapshot;
mod update;

// Re-export all public types
pub use config::{
    Config, IdStability, LoggingConfig, ProviderInfo, RemoteConfig, SearchConfig, StorageConfig,
    SyncConfig, VisitConfig, ttl_from_minutes,
};
pub use favorite::FavoriteEntry;
pub use novel::{
    Attention, Author, EngineCounts, NovelKey, NovelKind, NovelRecord, RemoteFields, TocItem,
    Translation, TranslatorEngine,
};
pub use outline::{NovelOutline, Page};
pub use review::ReviewRecord;
pub use snapshot::{RankItem, RankOptions, RemoteSnapshot, RemoteTocItem};
pub use update::{NovelUpdate, SyncUpdate, TranslationPatch};
