// src/error.rs

//! Unified error handling for the sync engine.

use std::fmt;

use thiserror::Error;

use crate::models::NovelKey;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Neither the upstream source nor the local store knows this novel
    #[error("Novel not found: {key}")]
    NotFound { key: NovelKey },

    /// Upstream source could not produce a snapshot
    #[error("Remote error for {context}: {message}")]
    Remote { context: String, message: String },

    /// Subsystems disagree in a way a retry cannot fix
    #[error("Consistency violation: {0}")]
    Consistency(String),

    /// A record with this key already exists
    #[error("Novel already stored: {key}")]
    Duplicate { key: NovelKey },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a not-found error for a novel key.
    pub fn not_found(key: &NovelKey) -> Self {
        Self::NotFound { key: key.clone() }
    }

    /// Create a remote source error with context.
    pub fn remote(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Remote {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a consistency violation error.
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
