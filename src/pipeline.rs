//! Batch download pipeline.
//!
//! A batch runs in two passes separated by a confirmation gate:
//!
//! 1. [`Downloader::plan`] counts the pages of every requested chapter and
//!    produces a [`BatchPlan`]; the batch-wide total is fixed here.
//! 2. [`Downloader::fetch`] consumes that plan, re-resolves each chapter's
//!    routing token and downloads every page with at most
//!    `max_connections` page fetches in flight across the whole batch.
//!
//! Fetching is only reachable through a plan, so no page is written before
//! every chapter has been counted. Per-page and per-chapter failures are
//! logged and skipped; a batch always runs to completion.

use crate::config::DownloadConfig;
use crate::error::{ChapterError, StorageError};
use crate::history::HistoryLedger;
use crate::naming::{ChapterToken, RoutingToken, Title, build_page_url, page_path};
use crate::source::{ChapterResolver, HttpSource, PageProber};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Observer of batch progress, e.g. a terminal progress bar.
///
/// Called once per written page and once more when the batch completes.
/// `total` is fixed for the duration of a batch.
pub trait ProgressSink: Send + Sync {
    fn update(&self, current: u64, total: u64);
}

/// Decides whether a counted batch should be downloaded.
#[async_trait]
pub trait ConfirmGate: Send + Sync {
    async fn confirm(&self, plan: &BatchPlan) -> bool;
}

/// Gate that always proceeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

#[async_trait]
impl ConfirmGate for AssumeYes {
    async fn confirm(&self, _plan: &BatchPlan) -> bool {
        true
    }
}

/// Page count of one requested chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterPlan {
    /// Chapter number as the caller wrote it.
    pub requested: String,
    pub token: ChapterToken,
    /// 0 means the chapter could not be resolved or has no pages.
    pub pages: u32,
}

/// A requested chapter whose number could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedChapter {
    pub requested: String,
    pub error: ChapterError,
}

/// Result of the counting pass.
#[derive(Debug)]
pub struct BatchPlan {
    chapters: Vec<ChapterPlan>,
    rejected: Vec<RejectedChapter>,
    total_pages: u64,
}

impl BatchPlan {
    /// Counted chapters in submission order.
    pub fn chapters(&self) -> &[ChapterPlan] {
        &self.chapters
    }

    /// Chapters excluded because their number is invalid.
    pub fn rejected(&self) -> &[RejectedChapter] {
        &self.rejected
    }

    /// Sum of all chapter page counts; the progress denominator.
    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }
}

/// Summary of a completed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub total_pages: u64,
    pub pages_written: u64,
    /// Pages whose download or write failed.
    pub pages_failed: u64,
    /// Pages of chapters whose routing token could not be resolved again.
    pub pages_skipped: u64,
    pub chapters_skipped: Vec<ChapterToken>,
    /// Whether the title was newly added to the history ledger.
    pub history_recorded: bool,
}

/// How a batch ended.
#[derive(Debug)]
pub enum BatchOutcome {
    /// The gate declined; nothing was downloaded or recorded.
    Aborted(BatchPlan),
    Completed(BatchReport),
}

/// Batch-wide progress counter shared by concurrent page fetches.
struct BatchProgress<'a> {
    current: AtomicU64,
    total: u64,
    sink: &'a dyn ProgressSink,
}

impl<'a> BatchProgress<'a> {
    fn new(total: u64, sink: &'a dyn ProgressSink) -> Self {
        Self {
            current: AtomicU64::new(0),
            total,
            sink,
        }
    }

    /// Sink updates stay monotonic only because every page future is polled
    /// on the one task draining `for_each_concurrent`; spawned fetches could
    /// report counts out of order.
    fn advance(&self) {
        let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.sink.update(current, self.total);
    }

    /// Snaps the counter to the total, even if some pages failed.
    fn finish(&self) {
        self.current.store(self.total, Ordering::SeqCst);
        self.sink.update(self.total, self.total);
    }
}

/// One page to download.
struct PageJob<'p> {
    chapter: &'p ChapterPlan,
    page: u32,
    routing: RoutingToken,
}

/// Downloads chapters of a single title.
pub struct Downloader {
    title: Title,
    resolver: ChapterResolver,
    settings: DownloadConfig,
    history: HistoryLedger,
}

impl Downloader {
    pub fn new(
        title: Title,
        source: Arc<dyn HttpSource>,
        host: impl Into<String>,
        settings: DownloadConfig,
    ) -> Self {
        let resolver = ChapterResolver::new(source, host, title.slug.clone());
        let history = HistoryLedger::new(settings.history_file.clone());

        Self {
            title,
            resolver,
            settings,
            history,
        }
    }

    pub fn title(&self) -> &Title {
        &self.title
    }

    pub fn history(&self) -> &HistoryLedger {
        &self.history
    }

    /// Counts, asks the gate, then fetches.
    pub async fn run(
        &self,
        requested: &[String],
        gate: &dyn ConfirmGate,
        sink: &dyn ProgressSink,
    ) -> BatchOutcome {
        let plan = self.plan(requested).await;

        if !gate.confirm(&plan).await {
            info!(title = %self.title, "Download canceled");
            return BatchOutcome::Aborted(plan);
        }

        BatchOutcome::Completed(self.fetch(plan, sink).await)
    }

    /// Counting pass: probes every requested chapter.
    ///
    /// Chapters whose number does not parse are reported in
    /// [`BatchPlan::rejected`] and take no further part in the batch.
    pub async fn plan(&self, requested: &[String]) -> BatchPlan {
        info!(title = %self.title, chapters = requested.len(), "Counting pages");

        let mut rejected = Vec::new();
        let mut tokens = Vec::new();
        for raw in requested {
            match ChapterToken::parse(raw) {
                Ok(token) => tokens.push((raw.clone(), token)),
                Err(error) => {
                    warn!(chapter = %raw, %error, "Skipping chapter");
                    rejected.push(RejectedChapter {
                        requested: raw.clone(),
                        error,
                    });
                }
            }
        }

        let limit = if self.settings.count_concurrently {
            self.settings.max_connections.max(1)
        } else {
            1
        };
        let prober = PageProber::new(&self.resolver);
        let prober = &prober;

        // `buffered` keeps submission order regardless of completion order.
        let chapters: Vec<ChapterPlan> = stream::iter(tokens)
            .map(move |(requested, token)| async move {
                let pages = prober.count_pages(&token).await;
                debug!(chapter = %token, pages, "Counted");
                ChapterPlan {
                    requested,
                    token,
                    pages,
                }
            })
            .buffered(limit)
            .collect()
            .await;

        let total_pages = chapters.iter().map(|c| u64::from(c.pages)).sum();

        BatchPlan {
            chapters,
            rejected,
            total_pages,
        }
    }

    /// Fetch pass and completion.
    ///
    /// Each chapter with pages is resolved again (the routing token may
    /// change between requests), then its pages join a single batch-wide
    /// queue drained with at most `max_connections` fetches in flight.
    pub async fn fetch(&self, plan: BatchPlan, sink: &dyn ProgressSink) -> BatchReport {
        let progress = BatchProgress::new(plan.total_pages, sink);
        let written = AtomicU64::new(0);
        let failed = AtomicU64::new(0);
        let skipped: Mutex<Vec<&ChapterPlan>> = Mutex::new(Vec::new());

        let (progress, written, failed, skipped_ref) = (&progress, &written, &failed, &skipped);
        let limit = self.settings.max_connections.max(1);

        stream::iter(plan.chapters.iter().filter(|chapter| chapter.pages > 0))
            .then(move |chapter| async move {
                let routing = self.resolver.resolve(&chapter.token).await;
                (chapter, routing)
            })
            .flat_map(move |(chapter, routing)| {
                let jobs: Vec<PageJob<'_>> = match routing {
                    Some(routing) => (1..=chapter.pages)
                        .map(|page| PageJob {
                            chapter,
                            page,
                            routing: routing.clone(),
                        })
                        .collect(),
                    None => {
                        warn!(chapter = %chapter.token, pages = chapter.pages, "Skipping unresolved chapter");
                        if let Ok(mut skipped) = skipped_ref.lock() {
                            skipped.push(chapter);
                        }
                        Vec::new()
                    }
                };
                stream::iter(jobs)
            })
            .for_each_concurrent(limit, move |job| async move {
                if self.fetch_page(&job).await {
                    written.fetch_add(1, Ordering::SeqCst);
                    progress.advance();
                } else {
                    failed.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await;

        progress.finish();

        let skipped = skipped.into_inner().unwrap_or_default();
        let mut report = BatchReport {
            total_pages: plan.total_pages,
            pages_written: written.load(Ordering::SeqCst),
            pages_failed: failed.load(Ordering::SeqCst),
            pages_skipped: skipped.iter().map(|c| u64::from(c.pages)).sum(),
            chapters_skipped: skipped.iter().map(|c| c.token.clone()).collect(),
            history_recorded: false,
        };

        match self.history.append(&self.title.display).await {
            Ok(recorded) => {
                report.history_recorded = recorded;
                if recorded {
                    info!(title = %self.title, "Saved to history");
                }
            }
            Err(e) => warn!(title = %self.title, error = %e, "Could not update history"),
        }

        info!(
            title = %self.title,
            written = report.pages_written,
            failed = report.pages_failed,
            skipped = report.pages_skipped,
            "Batch complete"
        );
        report
    }

    /// Downloads and stores one page. Failures are logged, never retried.
    async fn fetch_page(&self, job: &PageJob<'_>) -> bool {
        let chapter = &job.chapter.token;
        let url = build_page_url(&self.title.slug, chapter, job.page, &job.routing);

        let bytes = match self.resolver.source().get_bytes(&url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%chapter, page = job.page, error = %e, "Page download failed");
                return false;
            }
        };

        let path = page_path(
            &self.settings.output_directory,
            &self.title.slug,
            chapter,
            job.page,
        );
        if let Err(e) = write_page(&bytes, &path).await {
            warn!(%chapter, page = job.page, error = %e, "Page write failed");
            return false;
        }

        debug!(%url, path = %path.display(), "Downloaded");
        true
    }
}

/// Writes a page to `path`, creating parent directories and overwriting any
/// existing file. Not atomic: a crash mid-write can leave a truncated file.
pub async fn write_page(bytes: &[u8], path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })
}
