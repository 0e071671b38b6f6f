// src/services/dispatcher.rs

//! Notification dispatcher.
//!
//! Turns delivered items into provider payloads and submits them to the
//! push gateway.

use url::form_urlencoded;

use crate::error::{AppError, Result};
use crate::models::{
    Alert, ApplePayload, Aps, BarkPayload, CandidateItem, FeedKind, Level, ProvidersConfig,
    PushPayload, PushRequest, TelegramMessage, TelegramPayload,
};
use crate::utils::escape_markdown_v2;
use crate::utils::http::{HttpRequest, Transport};

/// Per-feed presentation settings.
#[derive(Debug, Clone)]
pub struct FeedStyle<'a> {
    pub kind: FeedKind,
    pub group: &'a str,
    pub level: Level,
    pub icon: Option<&'a str>,
    pub active_keywords: &'a [String],
}

/// Service building and submitting gateway payloads.
pub struct Dispatcher<'a> {
    gateway_url: &'a str,
    providers: &'a ProvidersConfig,
    transport: &'a dyn Transport,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        gateway_url: &'a str,
        providers: &'a ProvidersConfig,
        transport: &'a dyn Transport,
    ) -> Self {
        Self {
            gateway_url,
            providers,
            transport,
        }
    }

    /// Level for one item: critical when an active keyword matches.
    pub fn level_for(item: &CandidateItem, style: &FeedStyle<'_>) -> Level {
        if item.body_contains_any(style.active_keywords) {
            Level::Critical
        } else {
            style.level
        }
    }

    /// One payload per configured provider.
    pub fn build_payloads(&self, item: &CandidateItem, style: &FeedStyle<'_>) -> Vec<PushPayload> {
        let level = Self::level_for(item, style);
        let body = item.rendered_body();
        let icon = style
            .icon
            .map(str::to_string)
            .or_else(|| item.icon_url.clone());

        let mut payloads = Vec::new();

        if let Some(telegram) = &self.providers.telegram {
            payloads.push(PushPayload::Telegram(TelegramPayload {
                bot_id: telegram.bot_id.clone(),
                chat_id: telegram.chat_id.clone(),
                message: TelegramMessage {
                    text: telegram_text(item, style, &body, telegram.redirect_url.as_deref()),
                    parse_mode: "MarkdownV2".to_string(),
                },
            }));
        }

        if let Some(apns) = &self.providers.apns {
            let group = apns.group.clone().unwrap_or_else(|| style.group.to_string());
            payloads.push(PushPayload::Apple(ApplePayload {
                group: group.clone(),
                url: item.source_url.clone(),
                icon: icon.clone(),
                device_token: apns.device_token.clone(),
                aps: Aps {
                    thread_id: group,
                    interruption_level: level,
                    alert: Alert {
                        title: alert_title(item, style),
                        body: body.clone(),
                    },
                },
            }));
        }

        if let Some(bark) = &self.providers.bark {
            payloads.push(PushPayload::Bark(BarkPayload {
                device_key: bark.device_key.clone(),
                title: alert_title(item, style),
                body,
                level,
                icon,
                group: style.group.to_string(),
                url: item.source_url.clone(),
                endpoint: bark.endpoint.clone(),
            }));
        }

        payloads
    }

    /// Submit one gateway request carrying `messages`.
    ///
    /// An empty message list sends nothing and succeeds.
    pub async fn submit(&self, feed_id: &str, messages: &[PushPayload]) -> Result<()> {
        if messages.is_empty() {
            log::debug!("Nothing to push for {}", feed_id);
            return Ok(());
        }

        let body = serde_json::to_string(&PushRequest { messages })?;
        let response = self
            .transport
            .call(HttpRequest::post_json(self.gateway_url, body))
            .await
            .map_err(|e| {
                log::warn!("Gateway unreachable for {}: {}", feed_id, e);
                AppError::dispatch(feed_id, None, Some(&e.to_string()))
            })?;

        if !response.is_success() {
            return Err(AppError::dispatch(
                feed_id,
                Some(response.status),
                response.body.as_deref(),
            ));
        }

        log::debug!(
            "Pushed {} message(s) for {} (status {})",
            messages.len(),
            feed_id,
            response.status
        );
        Ok(())
    }
}

/// Alert title: the channel name for channel posts, the section for threads.
fn alert_title(item: &CandidateItem, style: &FeedStyle<'_>) -> String {
    match style.kind {
        FeedKind::Channel if !item.author_or_channel.is_empty() => item.author_or_channel.clone(),
        FeedKind::Thread if !item.author_or_channel.is_empty() => {
            format!("{}: {}", item.author_or_channel, item.title)
        }
        _ => item.title.clone(),
    }
}

fn telegram_text(
    item: &CandidateItem,
    style: &FeedStyle<'_>,
    body: &str,
    redirect_url: Option<&str>,
) -> String {
    match style.kind {
        FeedKind::Channel => format!(
            "*{}*\n\n{}",
            escape_markdown_v2(&item.author_or_channel),
            escape_markdown_v2(body)
        ),
        FeedKind::Thread => {
            let heading = if item.author_or_channel.is_empty() {
                escape_markdown_v2("New thread")
            } else {
                escape_markdown_v2(&format!("New thread in {}", item.author_or_channel))
            };
            let mut text = format!(
                "{}\n[{}]({})",
                heading,
                escape_markdown_v2(&item.title),
                escape_link(&item.source_url)
            );
            if let (Some(redirect), Some(app_url)) = (redirect_url, item.app_url.as_deref()) {
                let encoded: String = form_urlencoded::byte_serialize(app_url.as_bytes()).collect();
                text.push_str(&format!(
                    "\n\n[{}]({})",
                    escape_markdown_v2("Open in app"),
                    escape_link(&format!("{redirect}?url={encoded}"))
                ));
            }
            let mut times = Vec::new();
            if let Some(created) = &item.created_at {
                times.push(format!("Created: {created}"));
            }
            if let Some(updated) = &item.updated_at {
                times.push(format!("Last reply: {updated}"));
            }
            if !times.is_empty() {
                text.push_str("\n\n");
                text.push_str(&escape_markdown_v2(&times.join("\n")));
            }
            text
        }
    }
}

/// Inside `(...)` of a MarkdownV2 link only `)` and `\` need escaping.
fn escape_link(url: &str) -> String {
    url.replace('\\', "\\\\").replace(')', "\\)")
}
