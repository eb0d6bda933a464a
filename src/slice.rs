//! Front-matter excerpt selection.
//!
//! Title, authors, abstract and keywords usually sit on the first one or
//! two pages. The slicer reads a primary page window and, if that excerpt
//! shows no front-matter signal word and the document is longer than the
//! window, re-reads a wider fallback window and keeps that result
//! whether or not it contains a signal.
//!
//! Both windows are clamped to the document length and truncated to the
//! same character budget.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::SlicingConfig;
use crate::document::PageSource;
use crate::models::{ContentSlice, SliceWindow};

static FRONT_SIGNAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:abstract|keywords?|index terms)\b").expect("valid signal regex")
});

/// True when `text` contains a whole-word front-matter cue.
pub fn has_front_signal(text: &str) -> bool {
    FRONT_SIGNAL.is_match(text)
}

/// Trimmed, non-empty page texts of the first `pages` pages joined with a
/// blank line and cut to `max_chars` characters.
pub fn extract_pages_text(doc: &dyn PageSource, pages: usize, max_chars: usize) -> String {
    let end = pages.min(doc.page_count());
    let parts: Vec<String> = (0..end)
        .map(|i| doc.page_text(i).trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    let joined = parts.join("\n\n");
    truncate_chars(joined.trim(), max_chars)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Select the front-matter excerpt of a document.
pub fn slice(
    doc: &dyn PageSource,
    primary_pages: usize,
    fallback_pages: usize,
    max_chars: usize,
) -> ContentSlice {
    let page_count = doc.page_count();
    let primary_n = primary_pages.min(page_count);
    let text = extract_pages_text(doc, primary_n, max_chars);

    if has_front_signal(&text) || page_count <= primary_n {
        return make_slice(text, SliceWindow::Primary, primary_n);
    }

    let fallback_n = fallback_pages.min(page_count);
    tracing::debug!(
        primary_pages = primary_n,
        fallback_pages = fallback_n,
        "no front-matter signal in primary window; using fallback window"
    );
    let text = extract_pages_text(doc, fallback_n, max_chars);
    make_slice(text, SliceWindow::Fallback, fallback_n)
}

/// [`slice`] with the budgets from configuration.
pub fn slice_with(doc: &dyn PageSource, config: &SlicingConfig) -> ContentSlice {
    slice(
        doc,
        config.primary_pages,
        config.fallback_pages,
        config.max_chars,
    )
}

fn make_slice(text: String, window: SliceWindow, pages_read: usize) -> ContentSlice {
    ContentSlice {
        char_count: text.chars().count(),
        text,
        window,
        pages_read,
    }
}
