//! Error types for the m4l downloader.
//!
//! Uses `thiserror` for structured error definitions. Every per-page and
//! per-chapter error here is handled locally by the pipeline; none of them
//! aborts a batch.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for a single GET against the remote source.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection, timeout or body-read failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with something other than 200
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
}

/// Error type for routing token resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The viewer page could not be fetched
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The viewer page was fetched but carries no routing token
    #[error("Routing token not found in {url}")]
    TokenNotFound { url: String },
}

/// Error type for chapter identifiers supplied by the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChapterError {
    /// Integer part of a chapter number is not a base-10 integer
    #[error("Invalid chapter number: {0:?}")]
    InvalidChapterNumber(String),

    /// A `a-b` range item could not be expanded
    #[error("Invalid chapter range: {0:?}")]
    InvalidRange(String),
}

/// Error type for page writes.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create the chapter directory
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the page file
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error type for the download history ledger.
#[derive(Error, Debug)]
pub enum HistoryError {
    /// Failed to read or append to the ledger file
    #[error("Failed to access download history: {0}")]
    Io(#[from] std::io::Error),
}

/// Error type for configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse config file
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid config value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Config directory not found
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Result type alias using anyhow for application-level error handling.
pub type Result<T> = anyhow::Result<T>;
