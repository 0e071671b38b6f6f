// src/services/extract.rs

//! Record extraction from raw feed pages.
//!
//! Extraction never fails on bad input: a malformed document yields zero or
//! partial records and the problem is logged.

use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::CandidateItem;
use crate::utils::resolve_url;

/// Title used when a message carries no text at all.
pub const MEDIA_ONLY_TITLE: &str = "Please open Telegram to view this post";

/// Title used when a thread has no subject.
pub const UNTITLED_THREAD: &str = "(untitled thread)";

/// Parser for public channel listing pages.
pub struct ChannelPageParser {
    header_title: Selector,
    header_avatar: Selector,
    message: Selector,
    text: Selector,
    bold: Selector,
    date: Selector,
}

impl ChannelPageParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            header_title: parse_selector(".tgme_header_title")?,
            header_avatar: parse_selector(".tgme_header_link img")?,
            message: parse_selector(".tgme_widget_message[data-post]")?,
            text: parse_selector(".js-message_text")?,
            bold: parse_selector(".js-message_text > b")?,
            date: parse_selector("time[datetime]")?,
        })
    }

    /// Extract the messages of one listing page, in page order.
    pub fn parse(&self, feed_id: &str, page_url: &str, html: &str) -> Vec<CandidateItem> {
        let document = Html::parse_document(html);
        let base_url = Url::parse(page_url).ok();

        let channel_name = document
            .select(&self.header_title)
            .next()
            .map(|e| collapse_whitespace(&e.text().collect::<String>()))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| feed_id.to_string());
        let avatar = document
            .select(&self.header_avatar)
            .next()
            .and_then(|e| e.value().attr("src"))
            .map(|src| match &base_url {
                Some(base) => resolve_url(base, src),
                None => src.to_string(),
            });

        let mut items = Vec::new();
        for message in document.select(&self.message) {
            match self.parse_message(feed_id, &channel_name, avatar.as_deref(), &message) {
                Some(item) => items.push(item),
                None => log::debug!(
                    "Skipping message without usable id in {}: {:?}",
                    feed_id,
                    message.value().attr("data-post")
                ),
            }
        }
        items
    }

    fn parse_message(
        &self,
        feed_id: &str,
        channel_name: &str,
        avatar: Option<&str>,
        message: &ElementRef,
    ) -> Option<CandidateItem> {
        let post = message.value().attr("data-post")?;
        let (username, raw_id) = post.rsplit_once('/')?;
        let item_id: u64 = raw_id.trim().parse().ok()?;

        let (title, body) = match message.select(&self.text).next() {
            Some(text_elem) => {
                let body = text_with_breaks(&text_elem).trim().to_string();
                let bold = message
                    .select(&self.bold)
                    .next()
                    .map(|b| collapse_whitespace(&b.text().collect::<String>()))
                    .unwrap_or_default();
                let title = if !bold.is_empty() {
                    bold
                } else {
                    body.lines()
                        .map(str::trim)
                        .find(|line| !line.is_empty())
                        .unwrap_or(MEDIA_ONLY_TITLE)
                        .to_string()
                };
                (title, body)
            }
            None => (MEDIA_ONLY_TITLE.to_string(), String::new()),
        };

        let created_at = message
            .select(&self.date)
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .map(str::to_string);

        Some(CandidateItem {
            feed_id: feed_id.to_string(),
            item_id,
            title,
            body,
            source_url: format!("tg://resolve?domain={username}&post={item_id}&single"),
            author_or_channel: channel_name.to_string(),
            icon_url: avatar.map(str::to_string),
            app_url: None,
            created_at,
            updated_at: None,
        })
    }
}

/// One thread record of the listing API.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadRecord {
    #[serde(deserialize_with = "de_id")]
    pub tid: u64,

    #[serde(default)]
    pub subject: String,

    /// Forum section name
    #[serde(default)]
    pub fname: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub ios_app_scheme_url: Option<String>,

    /// Posting timestamp; records without one are incomplete
    #[serde(default)]
    pub postdate: Value,

    #[serde(default, rename = "postdateStr")]
    pub postdate_str: Option<String>,

    #[serde(default, rename = "lastpostStr")]
    pub lastpost_str: Option<String>,

    #[serde(default)]
    pub icon: Option<String>,
}

impl ThreadRecord {
    /// Whether the record carries a usable posting timestamp.
    pub fn is_posted(&self) -> bool {
        match &self.postdate {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        }
    }

    pub fn into_item(self, feed_id: &str) -> CandidateItem {
        let subject = self.subject.trim().to_string();
        let title = if subject.is_empty() {
            UNTITLED_THREAD.to_string()
        } else {
            subject.clone()
        };

        CandidateItem {
            feed_id: feed_id.to_string(),
            item_id: self.tid,
            title,
            body: subject,
            source_url: self.url,
            author_or_channel: self.fname,
            icon_url: self.icon.filter(|icon| icon.starts_with("http")),
            app_url: self.ios_app_scheme_url.filter(|u| !u.is_empty()),
            created_at: self.postdate_str,
            updated_at: self.lastpost_str,
        }
    }
}

/// Parse a thread listing page into its sub-groups, in page order.
pub fn parse_thread_page(feed_id: &str, body: &str) -> Vec<Vec<ThreadRecord>> {
    let page: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("{}", AppError::parse(feed_id, e));
            return Vec::new();
        }
    };

    let Some(groups) = page.get("data").and_then(Value::as_array) else {
        log::warn!("{}", AppError::parse(feed_id, "response has no data array"));
        return Vec::new();
    };

    groups
        .iter()
        .map(|group| {
            group
                .get("threads")
                .and_then(Value::as_array)
                .map(|threads| {
                    threads
                        .iter()
                        .filter_map(|raw| match ThreadRecord::deserialize(raw) {
                            Ok(record) => Some(record),
                            Err(e) => {
                                log::debug!("Skipping malformed thread in {}: {}", feed_id, e);
                                None
                            }
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect()
}

fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(n) => Ok(n),
        RawId::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Text content with `<br>` rendered as line breaks.
fn text_with_breaks(element: &ElementRef) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) if e.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
