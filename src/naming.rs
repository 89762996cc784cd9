//! Title slugs, chapter tokens and the URL/path templates built from them.
//!
//! Everything here is a pure function of its inputs. The URL shapes are the
//! remote service's contract and are reproduced exactly.

use crate::error::ChapterError;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

/// Runs of whitespace collapsed into a single slug separator.
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid WHITESPACE_RUN regex"));

/// Separator placed between words of a slug.
const SLUG_SEPARATOR: &str = "-";

/// A title as requested by the operator, with its derived slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    /// Case-transformed display name; this is what the history ledger records.
    pub display: String,

    /// Filesystem- and URL-safe form of `display`.
    pub slug: String,
}

impl Title {
    /// Builds a title from raw operator input.
    ///
    /// With `edit` set the input is kept verbatim; otherwise it is upper-cased
    /// when `uppercase` is set, or title-cased. The slug is the display name
    /// with whitespace runs replaced by `-`.
    pub fn new(raw: &str, uppercase: bool, edit: bool) -> Self {
        let display = if edit {
            raw.to_string()
        } else if uppercase {
            raw.to_uppercase()
        } else {
            title_case(raw)
        };
        let slug = WHITESPACE_RUN
            .replace_all(&display, SLUG_SEPARATOR)
            .into_owned();

        Self { display, slug }
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// Normalizes a title into its slug. Idempotent for a fixed pair of flags.
pub fn slugify(title: &str, uppercase: bool, edit: bool) -> String {
    Title::new(title, uppercase, edit).slug
}

/// Word title-casing: the first cased character after a non-cased one is
/// upper-cased, every other cased character is lower-cased.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_cased = false;

    for c in text.chars() {
        if previous_cased {
            out.extend(c.to_lowercase());
        } else {
            // Multi-char uppercase mappings (ß -> SS) keep only the first
            // letter upper so a second pass is a no-op.
            let mut upper = c.to_uppercase();
            if let Some(first) = upper.next() {
                out.push(first);
                out.extend(upper.flat_map(char::to_lowercase));
            }
        }
        previous_cased = c.is_uppercase() || c.is_lowercase();
    }

    out
}

/// A chapter number rendered as `NNNN` or `NNNN.<suffix>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChapterToken(String);

impl ChapterToken {
    /// Formats a raw chapter number.
    ///
    /// The part before the first `.` must be a base-10 integer and is
    /// zero-padded to four digits; anything after the `.` is kept verbatim.
    pub fn parse(raw: &str) -> Result<Self, ChapterError> {
        let raw = raw.trim();
        let (integer_part, suffix) = match raw.split_once('.') {
            Some((integer_part, suffix)) => (integer_part, Some(suffix)),
            None => (raw, None),
        };

        let number: u64 = integer_part
            .parse()
            .map_err(|_| ChapterError::InvalidChapterNumber(raw.to_string()))?;

        let token = match suffix {
            Some(suffix) => format!("{number:04}.{suffix}"),
            None => format!("{number:04}"),
        };
        Ok(Self(token))
    }

    /// Returns the formatted token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ChapterToken {
    type Err = ChapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ChapterToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Formats a raw chapter number into its fixed-width token string.
pub fn format_chapter_token(raw: &str) -> Result<String, ChapterError> {
    ChapterToken::parse(raw).map(|token| token.0)
}

/// Opaque host component extracted from a chapter's viewer page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingToken(String);

impl RoutingToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// URL of the chapter viewer page.
pub fn viewer_url(host: &str, slug: &str, chapter: &ChapterToken) -> String {
    format!("https://{host}/read-online/{slug}-chapter-{chapter}.html")
}

/// URL of the alternate ("index-2") chapter viewer page.
pub fn alternate_viewer_url(host: &str, slug: &str, chapter: &ChapterToken) -> String {
    format!("https://{host}/read-online/{slug}-chapter-{chapter}-index-2.html")
}

/// URL of a single page image. `page` is 1-based.
pub fn build_page_url(
    slug: &str,
    chapter: &ChapterToken,
    page: u32,
    routing: &RoutingToken,
) -> String {
    format!("https://{routing}/manga/{slug}/{chapter}-{page:03}.png")
}

/// Directory holding every page of one chapter.
pub fn chapter_dir(root: &Path, slug: &str, chapter: &ChapterToken) -> PathBuf {
    root.join(slug).join(format!("Chapter-{chapter}"))
}

/// Local path of a single page image.
pub fn page_path(root: &Path, slug: &str, chapter: &ChapterToken, page: u32) -> PathBuf {
    chapter_dir(root, slug, chapter).join(format!("{page:03}.png"))
}

/// Expands a comma-separated chapter list such as `1,2-5,7.5`.
///
/// Items are trimmed and empty items skipped. `a-b` expands to the inclusive
/// integer range; single items are kept verbatim so fractional chapters
/// survive. Duplicates are kept.
pub fn expand_chapter_list(input: &str) -> Result<Vec<String>, ChapterError> {
    let mut chapters = Vec::new();

    for item in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match item.split_once('-') {
            Some((start, end)) => {
                let invalid = || ChapterError::InvalidRange(item.to_string());
                let start: u64 = start.trim().parse().map_err(|_| invalid())?;
                let end: u64 = end.trim().parse().map_err(|_| invalid())?;
                if start > end {
                    return Err(invalid());
                }
                chapters.extend((start..=end).map(|n| n.to_string()));
            }
            None => chapters.push(item.to_string()),
        }
    }

    Ok(chapters)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TITLES: &[&str] = &[
        "one piece",
        "ONE  PIECE",
        "  leading and trailing  ",
        "Kaguya-sama wa Kokurasetai",
        "tab\tand\nnewline",
        "3rd time's the charm",
        "straße der zeit",
        "already-Slugged-Title",
        "",
    ];

    #[test]
    fn test_slugify_title_case() {
        assert_eq!(slugify("one piece", false, false), "One-Piece");
        assert_eq!(slugify("ONE   PIECE", false, false), "One-Piece");
        assert_eq!(slugify("jujutsu kaisen", false, false), "Jujutsu-Kaisen");
    }

    #[test]
    fn test_slugify_uppercase() {
        assert_eq!(slugify("one piece", true, false), "ONE-PIECE");
    }

    #[test]
    fn test_slugify_edit_keeps_case() {
        assert_eq!(slugify("Boku no  HERO", false, true), "Boku-no-HERO");
        assert_eq!(slugify("Boku no HERO", true, true), "Boku-no-HERO");
    }

    #[test]
    fn test_title_case_word_boundaries() {
        assert_eq!(title_case("kaguya-sama"), "Kaguya-Sama");
        assert_eq!(title_case("3rd"), "3Rd");
        assert_eq!(title_case("it's"), "It'S");
        assert_eq!(title_case("straße"), "Straße");
        assert_eq!(title_case("ßa"), "Ssa");
    }

    #[test]
    fn test_slugify_idempotent() {
        for title in SAMPLE_TITLES {
            for (uppercase, edit) in [(false, false), (true, false), (false, true), (true, true)] {
                let once = slugify(title, uppercase, edit);
                let twice = slugify(&once, uppercase, edit);
                assert_eq!(once, twice, "not idempotent for {title:?} ({uppercase}, {edit})");
            }
        }
    }

    #[test]
    fn test_title_display_is_case_transformed() {
        let title = Title::new("one piece", false, false);
        assert_eq!(title.display, "One Piece");
        assert_eq!(title.slug, "One-Piece");
    }

    #[test]
    fn test_format_chapter_token() {
        assert_eq!(format_chapter_token("1").unwrap(), "0001");
        assert_eq!(format_chapter_token("42").unwrap(), "0042");
        assert_eq!(format_chapter_token("1000").unwrap(), "1000");
        assert_eq!(format_chapter_token("12345").unwrap(), "12345");
        assert_eq!(format_chapter_token("10.5").unwrap(), "0010.5");
        assert_eq!(format_chapter_token("7.05").unwrap(), "0007.05");
        assert_eq!(format_chapter_token("007").unwrap(), "0007");
    }

    #[test]
    fn test_format_chapter_token_is_stable_on_tokens() {
        let token = format_chapter_token("10.5").unwrap();
        assert_eq!(format_chapter_token(&token).unwrap(), token);
    }

    #[test]
    fn test_format_chapter_token_rejects_non_numeric() {
        assert_eq!(
            format_chapter_token("abc"),
            Err(ChapterError::InvalidChapterNumber("abc".to_string()))
        );
        assert!(format_chapter_token("-1").is_err());
        assert!(format_chapter_token(".5").is_err());
        assert!(format_chapter_token("").is_err());
    }

    #[test]
    fn test_format_chapter_token_round_trips_integer_part() {
        for n in 0..10_000u64 {
            let token = format_chapter_token(&n.to_string()).unwrap();
            assert!(token.len() >= 4);
            assert_eq!(token.parse::<u64>().unwrap(), n);
        }
    }

    #[test]
    fn test_build_page_url() {
        let chapter = ChapterToken::parse("3").unwrap();
        let routing = RoutingToken::new("scans.example.net");
        assert_eq!(
            build_page_url("One-Piece", &chapter, 7, &routing),
            "https://scans.example.net/manga/One-Piece/0003-007.png"
        );
        assert_eq!(
            build_page_url("One-Piece", &chapter, 1234, &routing),
            "https://scans.example.net/manga/One-Piece/0003-1234.png"
        );
    }

    #[test]
    fn test_viewer_urls() {
        let chapter = ChapterToken::parse("10.5").unwrap();
        assert_eq!(
            viewer_url("manga4life.com", "One-Piece", &chapter),
            "https://manga4life.com/read-online/One-Piece-chapter-0010.5.html"
        );
        assert_eq!(
            alternate_viewer_url("manga4life.com", "One-Piece", &chapter),
            "https://manga4life.com/read-online/One-Piece-chapter-0010.5-index-2.html"
        );
    }

    #[test]
    fn test_page_path() {
        let chapter = ChapterToken::parse("1").unwrap();
        assert_eq!(
            page_path(Path::new("MANGA"), "One-Piece", &chapter, 12),
            Path::new("MANGA/One-Piece/Chapter-0001/012.png")
        );
    }

    #[test]
    fn test_expand_chapter_list() {
        assert_eq!(expand_chapter_list("1,2-3").unwrap(), vec!["1", "2", "3"]);
        assert_eq!(
            expand_chapter_list(" 5 , 7.5,, 9 - 10 ,5").unwrap(),
            vec!["5", "7.5", "9", "10", "5"]
        );
        assert!(expand_chapter_list("").unwrap().is_empty());
    }

    #[test]
    fn test_expand_chapter_list_rejects_bad_ranges() {
        assert_eq!(
            expand_chapter_list("5-3"),
            Err(ChapterError::InvalidRange("5-3".to_string()))
        );
        assert!(expand_chapter_list("a-3").is_err());
        assert!(expand_chapter_list("1-2.5").is_err());
    }
}
