//! DB-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, BoardError>;

/// Top-level error type for the departure board.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("[DB-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[DB-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[DB-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[DB-2001] no service data from {source_name}: {details}")]
    DataUnavailable {
        source_name: &'static str,
        details: String,
    },

    #[error("[DB-2002] undecodable payload from {context}: {details}")]
    Payload {
        context: &'static str,
        details: String,
    },

    #[error("[DB-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[DB-2201] HTTP failure for {url}: {details}")]
    Http { url: String, details: String },

    #[error("[DB-2202] connectivity lost: {details}")]
    ConnectivityLost { details: String },

    #[error("[DB-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[DB-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[DB-3101] background fetch failed: {details}")]
    WorkerFailure { details: String },

    #[error("[DB-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl BoardError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "DB-1001",
            Self::MissingConfig { .. } => "DB-1002",
            Self::ConfigParse { .. } => "DB-1003",
            Self::DataUnavailable { .. } => "DB-2001",
            Self::Payload { .. } => "DB-2002",
            Self::Serialization { .. } => "DB-2101",
            Self::Http { .. } => "DB-2201",
            Self::ConnectivityLost { .. } => "DB-2202",
            Self::Io { .. } => "DB-3002",
            Self::ChannelClosed { .. } => "DB-3003",
            Self::WorkerFailure { .. } => "DB-3101",
            Self::Runtime { .. } => "DB-3900",
        }
    }

    /// Whether retrying on a later refresh might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::Http { .. }
                | Self::ConnectivityLost { .. }
                | Self::DataUnavailable { .. }
                | Self::WorkerFailure { .. }
                | Self::ChannelClosed { .. }
                | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for BoardError {
    fn from(value: serde_json::Error) -> Self {
        Self::Payload {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for BoardError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<reqwest::Error> for BoardError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http {
            url: value
                .url()
                .map_or_else(|| "<unknown>".to_string(), ToString::to_string),
            details: value.to_string(),
        }
    }
}
