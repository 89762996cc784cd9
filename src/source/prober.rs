//! Page count discovery by sequential existence probes.

use super::{ChapterResolver, HttpSource};
use crate::naming::{ChapterToken, RoutingToken, build_page_url};
use tracing::{debug, warn};

/// Counts the pages of a chapter. No index is published, so pages are
/// probed from 1 until the first miss.
pub struct PageProber<'a> {
    resolver: &'a ChapterResolver,
}

impl<'a> PageProber<'a> {
    pub fn new(resolver: &'a ChapterResolver) -> Self {
        Self { resolver }
    }

    /// Returns the number of pages, or 0 when the routing token cannot be
    /// resolved or page 1 is already missing.
    pub async fn count_pages(&self, chapter: &ChapterToken) -> u32 {
        let Some(routing) = self.resolver.resolve(chapter).await else {
            return 0;
        };
        count_with_token(self.resolver.source(), self.resolver.slug(), chapter, &routing).await
    }
}

/// Length of the maximal run of successful probes starting at page 1.
async fn count_with_token(
    source: &dyn HttpSource,
    slug: &str,
    chapter: &ChapterToken,
    routing: &RoutingToken,
) -> u32 {
    let mut pages = 0;

    loop {
        let url = build_page_url(slug, chapter, pages + 1, routing);
        match source.probe(&url).await {
            Ok(()) => pages += 1,
            Err(e) => {
                if pages == 0 {
                    warn!(%chapter, error = %e, "First page missing");
                } else {
                    debug!(%chapter, pages, "Probe ended");
                }
                return pages;
            }
        }
    }
}
