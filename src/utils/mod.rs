//! Utility functions and helpers.

pub mod http;
pub mod log;

use std::sync::LazyLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;
use url::Url;

/// Characters Telegram requires to be escaped in MarkdownV2 text.
static MARKDOWN_V2_SPECIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[_*\[\]()~`>#+\-=|{}.!\\]").expect("static regex is valid")
});

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Keep at most `limit` chars of `text`, cutting only between grapheme clusters.
pub fn truncate_graphemes(text: &str, limit: usize) -> String {
    let mut chars = 0;
    let mut end = 0;
    for (offset, grapheme) in text.grapheme_indices(true) {
        chars += grapheme.chars().count();
        if chars > limit {
            return text[..end].to_string();
        }
        end = offset + grapheme.len();
    }
    text.to_string()
}

/// Escape text for Telegram's MarkdownV2 parse mode.
pub fn escape_markdown_v2(text: &str) -> String {
    MARKDOWN_V2_SPECIAL.replace_all(text, r"\$0").into_owned()
}

/// Inclusive page range, walked downwards when `from > to`.
pub fn page_range(from: u32, to: u32) -> impl Iterator<Item = u32> {
    let descending = from > to;
    let (low, high) = if descending { (to, from) } else { (from, to) };
    (low..=high).map(move |page| if descending { high - (page - low) } else { page })
}
