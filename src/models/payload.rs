//! Push gateway payloads.
//!
//! The gateway accepts `{"messages": [...]}` where every message is tagged
//! with the provider it targets, e.g. `{"bark": {...}}`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Notification interruption level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Level {
    #[default]
    Passive,
    Active,
    TimeSensitive,
    Critical,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Passive => "passive",
            Level::Active => "active",
            Level::TimeSensitive => "timeSensitive",
            Level::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// One provider-tagged gateway message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushPayload {
    Telegram(TelegramPayload),
    Apple(ApplePayload),
    Bark(BarkPayload),
}

impl PushPayload {
    /// Provider tag as it appears on the wire.
    pub fn provider(&self) -> &'static str {
        match self {
            PushPayload::Telegram(_) => "telegram",
            PushPayload::Apple(_) => "apple",
            PushPayload::Bark(_) => "bark",
        }
    }
}

/// Request body sent to the gateway.
#[derive(Debug, Serialize)]
pub struct PushRequest<'a> {
    pub messages: &'a [PushPayload],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramPayload {
    pub bot_id: String,
    pub chat_id: String,
    pub message: TelegramMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub text: String,
    pub parse_mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplePayload {
    pub group: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub device_token: String,
    pub aps: Aps,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aps {
    #[serde(rename = "thread-id")]
    pub thread_id: String,
    #[serde(rename = "interruption-level")]
    pub interruption_level: Level,
    pub alert: Alert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarkPayload {
    pub device_key: String,
    pub title: String,
    pub body: String,
    pub level: Level,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub group: String,
    pub url: String,
    pub endpoint: String,
}
