//! Candidate item data structure.

use serde::{Deserialize, Serialize};

use crate::utils::truncate_graphemes;

/// Provider payload limit for the notification body.
pub const BODY_LIMIT: usize = 1024;

/// Which pagination and dedup policy a feed follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    /// Channel listing, deduplicated by a numeric cursor
    Channel,
    /// Forum thread listing, deduplicated by per-item delivery flags
    Thread,
}

/// An item extracted from a feed page, not yet delivered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateItem {
    /// Feed the item was collected from
    pub feed_id: String,

    /// Dedup key, ascending within a feed
    pub item_id: u64,

    /// Never empty once extracted
    pub title: String,

    /// Plain text body (may be empty)
    pub body: String,

    /// Link opened by the notification
    pub source_url: String,

    /// Channel display name or forum section name
    pub author_or_channel: String,

    pub icon_url: Option<String>,

    /// Native app deep link, when the source provides one
    pub app_url: Option<String>,

    pub created_at: Option<String>,

    pub updated_at: Option<String>,
}

impl CandidateItem {
    /// Body as it appears in a provider payload.
    pub fn rendered_body(&self) -> String {
        truncate_graphemes(&self.body, BODY_LIMIT)
    }

    /// Whether the body contains any of `keywords` (case-sensitive).
    pub fn body_contains_any(&self, keywords: &[String]) -> bool {
        keywords
            .iter()
            .any(|k| !k.is_empty() && self.body.contains(k.as_str()))
    }
}

#[cfg(test)]
pub(crate) fn sample_item(feed_id: &str, item_id: u64, body: &str) -> CandidateItem {
    CandidateItem {
        feed_id: feed_id.to_string(),
        item_id,
        title: format!("post {item_id}"),
        body: body.to_string(),
        source_url: format!("tg://resolve?domain={feed_id}&post={item_id}&single"),
        author_or_channel: feed_id.to_string(),
        icon_url: None,
        app_url: None,
        created_at: None,
        updated_at: None,
    }
}
