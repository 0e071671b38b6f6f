// src/services/channels.rs

//! Channel collector: offset-walk pagination over public listing pages.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::{CandidateItem, ChannelsConfig};
use crate::services::extract::ChannelPageParser;
use crate::utils::http::{HttpRequest, Transport};

/// Items collected for one channel during a run.
#[derive(Debug, Default)]
pub struct ChannelBatch {
    /// New items, ascending by id, capped at the configured maximum
    pub items: Vec<CandidateItem>,

    /// Highest id seen on any fetched page
    pub highest_seen: Option<u64>,

    /// Number of page requests issued
    pub pages_fetched: usize,

    /// Page failure that cut the walk short, if any
    pub interrupted: Option<AppError>,
}

impl ChannelBatch {
    /// Id the cursor moves to once this batch is delivered.
    pub fn commit_id(&self) -> Option<u64> {
        self.items.last().map(|item| item.item_id)
    }
}

/// Service walking a channel listing forward from a cursor.
pub struct ChannelCollector<'a> {
    config: &'a ChannelsConfig,
    transport: &'a dyn Transport,
    parser: ChannelPageParser,
    request_delay: Duration,
}

impl<'a> ChannelCollector<'a> {
    pub fn new(
        config: &'a ChannelsConfig,
        transport: &'a dyn Transport,
        request_delay: Duration,
    ) -> Result<Self> {
        Ok(Self {
            config,
            transport,
            parser: ChannelPageParser::new()?,
            request_delay,
        })
    }

    fn page_url(&self, channel: &str, after: u64) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if after == 0 {
            format!("{base}/{channel}")
        } else {
            format!("{base}/{channel}?after={after}")
        }
    }

    /// Collect items newer than `cursor` (0 when none was persisted).
    ///
    /// Stops when a page brings fewer than a full page of new items, when
    /// enough items were gathered, or when a page cannot be fetched. In the
    /// last case the items of earlier pages are still returned.
    pub async fn collect(&self, channel: &str, cursor: u64) -> ChannelBatch {
        let page_size = self.config.page_size.max(1);
        let max_items = self.config.max_items.max(1);

        let mut batch = ChannelBatch::default();
        let mut collected: BTreeMap<u64, CandidateItem> = BTreeMap::new();
        let mut after = cursor;

        loop {
            if batch.pages_fetched > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            let url = self.page_url(channel, after);
            log::debug!("Fetching channel page {}", url);
            batch.pages_fetched += 1;

            let html = match self.fetch_page(channel, &url).await {
                Ok(html) => html,
                Err(error) => {
                    log::warn!(
                        "Abandoning {} after {} page(s): {}",
                        channel,
                        batch.pages_fetched,
                        error
                    );
                    batch.interrupted = Some(error);
                    break;
                }
            };

            let records = self.parser.parse(channel, &url, &html);
            if let Some(max_id) = records.iter().map(|r| r.item_id).max() {
                batch.highest_seen = batch.highest_seen.max(Some(max_id));
            }

            let fresh: Vec<CandidateItem> = records
                .into_iter()
                .filter(|r| r.item_id > cursor)
                .collect();
            let fresh_count = fresh.len();
            let page_max = fresh.iter().map(|r| r.item_id).max();
            for item in fresh {
                collected.entry(item.item_id).or_insert(item);
            }

            if fresh_count < page_size || collected.len() >= max_items {
                break;
            }
            match page_max {
                Some(next) if next > after => after = next,
                _ => break,
            }
        }

        batch.items = collected.into_values().take(max_items).collect();
        log::info!(
            "Channel {}: {} new item(s) from {} page(s)",
            channel,
            batch.items.len(),
            batch.pages_fetched
        );
        batch
    }

    async fn fetch_page(&self, channel: &str, url: &str) -> Result<String> {
        let response = self
            .transport
            .call(HttpRequest::get(url))
            .await
            .map_err(|e| AppError::fetch(channel, None, e, None))?;

        if !response.is_success() {
            return Err(AppError::fetch(
                channel,
                Some(response.status),
                format!("GET {url} returned {}", response.status),
                response.body.as_deref(),
            ));
        }

        Ok(response.body.unwrap_or_default())
    }
}
