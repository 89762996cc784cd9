//! m4l - chapter downloader for paginated manga viewers.
//!
//! This library provides functionality for:
//! - Normalizing titles and chapter numbers into the viewer's URL scheme
//! - Resolving per-chapter routing tokens and probing page counts
//! - Downloading whole batches of chapters under a global connection cap
//! - Recording completed titles in a download history ledger

pub mod config;
pub mod console;
pub mod error;
pub mod history;
pub mod logging;
pub mod naming;
pub mod pipeline;
pub mod source;

// Re-export commonly used types
pub use config::Config;
pub use console::Console;
pub use error::{ChapterError, ConfigError, FetchError, HistoryError, ResolveError, StorageError};
pub use history::HistoryLedger;
pub use naming::{ChapterToken, RoutingToken, Title, expand_chapter_list, slugify};
pub use pipeline::{
    AssumeYes, BatchOutcome, BatchPlan, BatchReport, ChapterPlan, ConfirmGate, Downloader,
    ProgressSink,
};
pub use source::{ChapterResolver, HttpSource, PageProber, ReqwestSource};
