//! novelsync CLI
//!
//! Local entry point over file-backed storage and an HTTP snapshot gateway.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use novelsync::{
    config::{self, CONFIG_ENV, DEFAULT_CONFIG_PATH},
    error::{AppError, Result},
    models::{Config, NovelKey, RankOptions, ttl_from_minutes},
    pipeline::{InMemoryIndex, SearchQuery},
    services::{Collaborators, HttpRemoteSource, NovelService, VisitCounter},
    storage::{LocalStorage, NovelStore, ReviewLog},
};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// novelsync - novel metadata sync engine
#[derive(Parser, Debug)]
#[command(name = "novelsync", version, about = "Novel metadata sync engine")]
struct Cli {
    /// Path to config file (default: $NOVELSYNC_CONFIG or data/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the storage directory from config
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show a novel, refreshing it from upstream when stale
    Get {
        provider: String,
        novel: String,

        /// Staleness threshold in minutes instead of the configured one
        #[arg(long)]
        ttl_minutes: Option<u64>,
    },

    /// Show an upstream ranking decorated with local progress
    Rank {
        provider: String,

        /// Ranking option as key=value (repeatable)
        #[arg(short, long = "option", value_parser = parse_option)]
        options: Vec<(String, String)>,
    },

    /// Search stored novels
    Search {
        /// Free-text query
        text: Option<String>,

        /// Restrict to provider (repeatable)
        #[arg(short, long = "provider")]
        providers: Vec<String>,

        /// all | serializing | completed | short_story
        #[arg(long, default_value = "all")]
        kind: String,

        /// all | general | r18
        #[arg(long, default_value = "all")]
        level: String,

        /// all | gpt | sakura
        #[arg(long, default_value = "all")]
        translate: String,

        /// update_at | visits | relevance
        #[arg(long, default_value = "update_at")]
        sort: String,

        #[arg(long, default_value_t = 0)]
        page: usize,

        /// 0 uses the configured default
        #[arg(long, default_value_t = 0)]
        page_size: usize,
    },

    /// Record a visit to a novel
    Visit {
        /// User id or client address
        subject: String,
        provider: String,
        novel: String,
    },

    /// Freeze or unfreeze structural sync of a novel
    Pause {
        provider: String,
        novel: String,

        /// Resume syncing instead
        #[arg(long)]
        off: bool,
    },

    /// Show logged toc reviews of a novel
    Reviews { provider: String, novel: String },

    /// Validate the configuration file
    Validate,

    /// Show storage and configuration info
    Info,
}

fn parse_option(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{s}'"))
}

/// Parse a snake_case filter name through its serde representation.
fn parse_filter<T: DeserializeOwned>(name: &str, value: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| AppError::validation(format!("unknown {name} '{value}'")))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let loaded = config::load_config_strict(&config_path);

    let level = match (&loaded, cli.verbose) {
        (_, true) => "debug",
        (Ok(config), false) => config.logging.level.as_str(),
        (Err(_), false) => "info",
    };
    init_logging(level);

    if let Command::Validate = cli.command {
        return match loaded {
            Ok(_) => {
                log::info!("✓ Config OK: {}", config_path.display());
                Ok(())
            }
            Err(e) => {
                log::error!("Config validation failed: {}", e);
                Err(e)
            }
        };
    }

    let mut config = loaded.unwrap_or_else(|e| {
        log::warn!("{}. Using default configuration.", e);
        Config::default()
    });
    if let Some(dir) = cli.storage_dir {
        config.storage.root_dir = dir;
    }

    let storage = Arc::new(LocalStorage::new(&config.storage.root_dir));
    let index = Arc::new(InMemoryIndex::from_records(&storage.list().await?));
    log::debug!("Indexed {} stored novels", index.len().await);

    match cli.command {
        Command::Get {
            provider,
            novel,
            ttl_minutes,
        } => {
            let service = novel_service(&config, &storage, &index)?;
            let key = NovelKey::new(provider, novel);
            let record = match ttl_minutes {
                Some(minutes) => {
                    service
                        .get_and_sync_with_ttl(&key, ttl_from_minutes(minutes)?)
                        .await?
                }
                None => service.get_and_sync(&key).await?,
            };
            print_json(&record)?;
        }

        Command::Rank { provider, options } => {
            let service = novel_service(&config, &storage, &index)?;
            let options: RankOptions = options.into_iter().collect();
            let outlines = service.list_rank(&provider, &options).await?;
            print_json(&outlines)?;
        }

        Command::Search {
            text,
            providers,
            kind,
            level,
            translate,
            sort,
            page,
            page_size,
        } => {
            let service = novel_service(&config, &storage, &index)?;
            let query = SearchQuery {
                text,
                providers,
                kind: parse_filter("kind", &kind)?,
                level: parse_filter("level", &level)?,
                translate: parse_filter("translate", &translate)?,
                sort: parse_filter("sort", &sort)?,
                page,
                page_size,
            };
            let outcome = service.search(query).await?;
            if !outcome.missing.is_empty() {
                log::warn!(
                    "{} hits had no stored record and were skipped",
                    outcome.missing.len()
                );
            }
            log::info!(
                "{} results, page {} of {}",
                outcome.page.total,
                page + 1,
                outcome.page.page_count()
            );
            print_json(&outcome.page)?;
        }

        Command::Visit {
            subject,
            provider,
            novel,
        } => {
            let counter = VisitCounter::from_config(storage.clone(), index.clone(), &config.visits);
            let key = NovelKey::new(provider, novel);
            if counter.record_visit(&subject, &key).await? {
                log::info!("Visit to {} counted", key);
            } else {
                log::info!("Visit to {} not counted", key);
            }
        }

        Command::Pause {
            provider,
            novel,
            off,
        } => {
            let service = novel_service(&config, &storage, &index)?;
            let key = NovelKey::new(provider, novel);
            match service.set_pause_update(&key, !off).await? {
                Some(record) => log::info!("{} pause_update = {}", key, record.pause_update),
                None => return Err(AppError::not_found(&key)),
            }
        }

        Command::Reviews { provider, novel } => {
            let key = NovelKey::new(provider, novel);
            let reviews = storage.list_for(&key).await?;
            print_json(&reviews)?;
        }

        Command::Info => {
            log::info!("Config: {}", config_path.display());
            log::info!("Storage directory: {}", storage.root_dir().display());
            log::info!("Stored novels: {}", index.len().await);
            log::info!("Snapshot gateway: {}", config.remote.base_url);
            log::info!("Refresh TTL: {} minutes", config.sync.ttl_minutes);
            for provider in &config.providers {
                log::info!("Provider {}: {:?} chapter ids", provider.id, provider.id_stability);
            }
        }

        Command::Validate => unreachable!("handled before storage setup"),
    }

    Ok(())
}

fn novel_service(
    config: &Config,
    storage: &Arc<LocalStorage>,
    index: &Arc<InMemoryIndex>,
) -> Result<NovelService> {
    let remote = Arc::new(HttpRemoteSource::from_config(&config.remote)?);
    let deps = Collaborators {
        store: storage.clone(),
        remote,
        index: index.clone(),
        reviews: storage.clone(),
        favorites: storage.clone(),
    };
    NovelService::new(deps, config)
}
