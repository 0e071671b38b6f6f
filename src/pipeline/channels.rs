// src/pipeline/channels.rs

//! Channel feed pipeline: collect, filter, dispatch, commit.

use crate::models::{ChannelsConfig, FeedKind, RunResult};
use crate::services::{ChannelCollector, FeedStyle};
use crate::storage::CursorStore;

use super::filter::DeliveryFilter;
use super::runner::FeedContext;

/// Run one channel feed end to end.
///
/// The cursor only moves after the gateway accepted the batch. A failed
/// page fetch keeps the items gathered before it.
pub async fn run_channel_feed(
    ctx: &FeedContext<'_>,
    config: &ChannelsConfig,
    channel: &str,
) -> RunResult {
    let result = RunResult::new(channel);
    let cursors = CursorStore::new(ctx.store);

    let cursor = match cursors.load(channel).await {
        Ok(cursor) => cursor.unwrap_or(0),
        Err(e) => return result.failed(e),
    };

    let collector = match ChannelCollector::new(config, ctx.transport, ctx.request_delay()) {
        Ok(collector) => collector,
        Err(e) => return result.failed(e),
    };

    let batch = collector.collect(channel, cursor).await;
    if let Some(error) = &batch.interrupted {
        log::warn!("Channel {} partially collected: {}", channel, error);
    }

    let Some(commit_id) = batch.commit_id() else {
        log::info!(
            "Channel {}: nothing new after {} (newest seen: {:?})",
            channel,
            cursor,
            batch.highest_seen
        );
        return result;
    };

    let filter = DeliveryFilter::new(&config.keywords);
    let (eligible, suppressed) = filter.apply(batch.items);

    let style = FeedStyle {
        kind: FeedKind::Channel,
        group: &config.group,
        level: config.level,
        icon: config.icon.as_deref(),
        active_keywords: &config.keywords.active_keywords,
    };
    let dispatcher = ctx.dispatcher();
    let payloads: Vec<_> = eligible
        .iter()
        .flat_map(|item| dispatcher.build_payloads(item, &style))
        .collect();

    if let Err(e) = dispatcher.submit(channel, &payloads).await {
        log::error!("Channel {}: cursor stays at {}: {}", channel, cursor, e);
        return result.failed(e);
    }

    match cursors.commit(channel, commit_id).await {
        Ok(true) => log::info!("Channel {}: cursor {} -> {}", channel, cursor, commit_id),
        Ok(false) => log::debug!("Channel {}: cursor already at or past {}", channel, commit_id),
        Err(e) => return result.failed(e),
    }

    RunResult {
        delivered: eligible.len(),
        suppressed,
        ..result
    }
}
