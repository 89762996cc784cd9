//! Download history ledger.
//!
//! A flat text file with one title per line, recording every title for which
//! a batch has completed. Single-process use only; there is no file locking.

use crate::error::HistoryError;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Ledger of completed titles backed by a text file.
#[derive(Debug, Clone)]
pub struct HistoryLedger {
    path: PathBuf,
}

impl HistoryLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `title` unless an identical line already exists.
    ///
    /// Returns `true` when the title was written.
    pub async fn append(&self, title: &str) -> Result<bool, HistoryError> {
        let existing = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        if existing.lines().any(|line| line == title) {
            debug!(title, "Title already in history");
            return Ok(false);
        }

        let mut entry = String::new();
        // Keep one title per line even if the file was edited by hand.
        if !existing.is_empty() && !existing.ends_with('\n') {
            entry.push('\n');
        }
        entry.push_str(title);
        entry.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await?;

        Ok(true)
    }

    /// Returns the recorded titles in insertion order, or `None` when the
    /// ledger file does not exist.
    pub async fn read(&self) -> Result<Option<Vec<String>>, HistoryError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content.lines().map(str::to_string).collect())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
