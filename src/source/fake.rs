//! In-memory [`HttpSource`] used by unit tests.

use super::HttpSource;
use crate::error::FetchError;
use crate::naming::{ChapterToken, RoutingToken, alternate_viewer_url, build_page_url, viewer_url};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) const HOST: &str = "viewer.test";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    Text,
    Bytes,
    Probe,
}

/// Serves canned bodies keyed by URL; anything else is a 404.
#[derive(Default)]
pub(crate) struct FakeSource {
    texts: HashMap<String, String>,
    expiring_texts: Mutex<HashMap<String, String>>,
    bytes: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<(CallKind, String)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_text(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.texts.insert(url.into(), body.into());
        self
    }

    /// Serves `body` for the first request only; later requests 404.
    pub(crate) fn with_expiring_text(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.expiring_texts
            .lock()
            .unwrap()
            .insert(url.into(), body.into());
        self
    }

    /// Registers a chapter whose primary viewer page carries `routing` and
    /// whose pages `1..=pages` exist.
    pub(crate) fn with_chapter(self, slug: &str, raw: &str, routing: &str, pages: u32) -> Self {
        let chapter = ChapterToken::parse(raw).unwrap();
        let source = self.with_text(viewer_url(HOST, slug, &chapter), viewer_page(routing));
        source.with_pages(slug, raw, routing, pages)
    }

    /// Same as [`Self::with_chapter`] but only the alternate viewer page works.
    pub(crate) fn with_alternate_chapter(
        self,
        slug: &str,
        raw: &str,
        routing: &str,
        pages: u32,
    ) -> Self {
        let chapter = ChapterToken::parse(raw).unwrap();
        let source = self.with_text(
            alternate_viewer_url(HOST, slug, &chapter),
            viewer_page(routing),
        );
        source.with_pages(slug, raw, routing, pages)
    }

    pub(crate) fn with_pages(mut self, slug: &str, raw: &str, routing: &str, pages: u32) -> Self {
        let chapter = ChapterToken::parse(raw).unwrap();
        let routing = RoutingToken::new(routing);
        for page in 1..=pages {
            let url = build_page_url(slug, &chapter, page, &routing);
            self.bytes.insert(url, page_bytes(&chapter, page));
        }
        self
    }

    pub(crate) fn without_bytes(mut self, url: &str) -> Self {
        self.bytes.remove(url);
        self
    }

    pub(crate) fn calls(&self) -> Vec<(CallKind, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, kind: CallKind) -> usize {
        self.calls().iter().filter(|(k, _)| *k == kind).count()
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, kind: CallKind, url: &str) {
        self.calls.lock().unwrap().push((kind, url.to_string()));
    }
}

/// Minimal viewer page with the routing token assignment embedded in a script.
pub(crate) fn viewer_page(routing: &str) -> String {
    format!(
        "<html><script>\n\tvm.CurChapter = {{}};\n\tvm.CurPathName = \"{routing}\";\n</script></html>"
    )
}

/// Deterministic page body so tests can check what landed on disk.
pub(crate) fn page_bytes(chapter: &ChapterToken, page: u32) -> Vec<u8> {
    format!("{chapter}:{page}").into_bytes()
}

fn not_found(url: &str) -> FetchError {
    FetchError::Status {
        url: url.to_string(),
        status: 404,
    }
}

#[async_trait]
impl HttpSource for FakeSource {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.record(CallKind::Text, url);
        if let Some(body) = self.expiring_texts.lock().unwrap().remove(url) {
            return Ok(body);
        }
        self.texts.get(url).cloned().ok_or_else(|| not_found(url))
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.record(CallKind::Bytes, url);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        // Let other page fetches get scheduled while this one is "in flight".
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.bytes.get(url).cloned().ok_or_else(|| not_found(url))
    }

    async fn probe(&self, url: &str) -> Result<(), FetchError> {
        self.record(CallKind::Probe, url);
        if self.bytes.contains_key(url) {
            Ok(())
        } else {
            Err(not_found(url))
        }
    }
}
