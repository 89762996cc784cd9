//! Routing token resolution from a chapter's viewer page.

use super::HttpSource;
use crate::error::ResolveError;
use crate::naming::{ChapterToken, RoutingToken, alternate_viewer_url, viewer_url};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

/// Assignment of the routing token inside the viewer page script.
static ROUTING_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"vm\.CurPathName\s*=\s*"([^"]+)""#).expect("Invalid ROUTING_TOKEN_REGEX")
});

/// Extracts the routing token from a viewer page body. First match wins.
pub fn extract_routing_token(html: &str) -> Option<RoutingToken> {
    ROUTING_TOKEN_REGEX
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| RoutingToken::new(m.as_str()))
}

/// Resolves per-chapter routing tokens for one title.
pub struct ChapterResolver {
    source: Arc<dyn HttpSource>,
    host: String,
    slug: String,
}

impl ChapterResolver {
    pub fn new(source: Arc<dyn HttpSource>, host: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            source,
            host: host.into(),
            slug: slug.into(),
        }
    }

    pub fn source(&self) -> &dyn HttpSource {
        self.source.as_ref()
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Resolves the routing token of a chapter.
    ///
    /// Tries the primary viewer page, then the `-index-2` variant exactly
    /// once. Any failure (transport error, non-200, missing token) on both
    /// degrades to `None`.
    pub async fn resolve(&self, chapter: &ChapterToken) -> Option<RoutingToken> {
        let primary = viewer_url(&self.host, &self.slug, chapter);
        match self.resolve_from(&primary).await {
            Ok(token) => return Some(token),
            Err(e) => debug!(%chapter, error = %e, "Primary viewer page failed, trying alternate"),
        }

        let alternate = alternate_viewer_url(&self.host, &self.slug, chapter);
        match self.resolve_from(&alternate).await {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(%chapter, error = %e, "Could not resolve routing token");
                None
            }
        }
    }

    async fn resolve_from(&self, url: &str) -> Result<RoutingToken, ResolveError> {
        let html = self.source.get_text(url).await?;
        extract_routing_token(&html).ok_or_else(|| ResolveError::TokenNotFound {
            url: url.to_string(),
        })
    }
}
