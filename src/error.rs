// src/error.rs

//! Unified error handling for the feed relay.

use std::fmt;

use thiserror::Error;

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Storage backend failure (S3 or other remote store)
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport failure reported by a non-reqwest transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// A required run parameter is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// A feed source was unreachable or answered with an error status
    #[error("Fetch failed for {feed} (status {status:?}): {detail}")]
    Fetch {
        feed: String,
        status: Option<u16>,
        detail: String,
        body: String,
    },

    /// A page could not be interpreted
    #[error("Parse error for {context}: {message}")]
    Parse { context: String, message: String },

    /// The push gateway rejected the submission or was unreachable
    #[error("Dispatch failed for {feed} (status {status:?}): {body}")]
    Dispatch {
        feed: String,
        status: Option<u16>,
        body: String,
    },
}

/// Maximum number of body characters kept on fetch/dispatch errors.
const BODY_FRAGMENT_LEN: usize = 256;

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a transport error.
    pub fn transport(message: impl fmt::Display) -> Self {
        Self::Transport(message.to_string())
    }

    /// Create a fetch failure, keeping only a fragment of the body.
    pub fn fetch(
        feed: impl Into<String>,
        status: Option<u16>,
        detail: impl fmt::Display,
        body: Option<&str>,
    ) -> Self {
        Self::Fetch {
            feed: feed.into(),
            status,
            detail: detail.to_string(),
            body: fragment(body),
        }
    }

    /// Create a parse error with context.
    pub fn parse(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a dispatch failure.
    pub fn dispatch(feed: impl Into<String>, status: Option<u16>, body: Option<&str>) -> Self {
        Self::Dispatch {
            feed: feed.into(),
            status,
            body: fragment(body),
        }
    }

    /// Whether this error aborts the whole run rather than a single feed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

fn fragment(body: Option<&str>) -> String {
    body.map(|b| b.chars().take(BODY_FRAGMENT_LEN).collect())
        .unwrap_or_default()
}
