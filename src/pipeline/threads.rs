// src/pipeline/threads.rs

//! Thread feed pipeline: page walk with per-thread delivery flags.

use crate::models::{FeedKind, RunResult, ThreadsConfig};
use crate::services::{FeedStyle, ThreadCollector};
use crate::storage::DeliveryCache;

use super::filter::DeliveryFilter;
use super::runner::FeedContext;

/// Run the thread feed end to end.
///
/// Each admitted thread is pushed on its own and flagged right after the
/// gateway accepts it. A page or gateway failure stops the feed; threads
/// flagged before that stay flagged.
pub async fn run_thread_feed(ctx: &FeedContext<'_>, config: &ThreadsConfig) -> RunResult {
    let collector = ThreadCollector::new(config, ctx.transport);
    let feed_id = collector.feed_id().to_string();
    let mut result = RunResult::new(&feed_id);

    let cache = DeliveryCache::new(ctx.store, &config.cache_prefix);
    let filter = DeliveryFilter::new(&config.keywords);
    let dispatcher = ctx.dispatcher();
    let style = FeedStyle {
        kind: FeedKind::Thread,
        group: &config.group,
        level: config.level,
        icon: None,
        active_keywords: &config.keywords.active_keywords,
    };

    if config.force {
        log::warn!("{}: force enabled, delivery flags are ignored", feed_id);
    }

    let delay = ctx.request_delay();
    for (index, page) in collector.pages().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let items = match collector.fetch_page(page).await {
            Ok(items) => items,
            Err(e) => {
                log::error!("{}: page {} failed: {}", feed_id, page, e);
                return result.failed(e);
            }
        };

        for item in items {
            if !filter.admit_thread(&cache, &item, config.force).await {
                result.suppressed += 1;
                continue;
            }

            let payloads = dispatcher.build_payloads(&item, &style);
            if let Err(e) = dispatcher.submit(&feed_id, &payloads).await {
                log::error!("{}: thread {} not delivered: {}", feed_id, item.item_id, e);
                return result.failed(e);
            }
            if let Err(e) = cache.mark_delivered(item.item_id).await {
                return result.failed(e);
            }
            result.delivered += 1;
        }
    }

    log::info!(
        "{}: {} delivered, {} skipped",
        feed_id,
        result.delivered,
        result.suppressed
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{BarkProvider, Config, GatewayConfig, KeywordRules, ProvidersConfig};
    use crate::storage::{KvStore, MemoryStore};
    use crate::test_support::{ScriptedTransport, thread_page};

    const GATEWAY: &str = "https://push.example.com/v3";
    const API: &str = "https://forum.example.com/api/threads";

    fn page_url(page: u32) -> String {
        format!("{API}?fid=7&order_by=lastpostdesc&page={page}")
    }

    fn config(from: u32, to: u32) -> Config {
        Config {
            gateway: GatewayConfig {
                url: Some(GATEWAY.into()),
            },
            threads: Some(ThreadsConfig {
                api_url: API.into(),
                forum_ids: vec!["7".into()],
                from,
                to,
                ..ThreadsConfig::default()
            }),
            providers: ProvidersConfig {
                bark: Some(BarkProvider {
                    device_key: "key".into(),
                    endpoint: "https://api.day.app/push".into(),
                }),
                ..ProvidersConfig::default()
            },
            ..Config::default()
        }
    }

    async fn run(config: &Config, transport: &ScriptedTransport, store: &MemoryStore) -> RunResult {
        let ctx = FeedContext::new(config, transport, store);
        run_thread_feed(&ctx, config.threads.as_ref().unwrap()).await
    }

    #[tokio::test]
    async fn test_pages_walk_in_configured_order() {
        let store = MemoryStore::new();
        let transport = ScriptedTransport::new()
            .respond(&page_url(3), 200, &thread_page([31]))
            .respond(&page_url(2), 200, &thread_page([21]))
            .respond(&page_url(1), 200, &thread_page([11]))
            .respond(GATEWAY, 200, "{}");
        let config = config(3, 1);

        let result = run(&config, &transport, &store).await;

        assert!(result.is_success());
        assert_eq!(result.delivered, 3);
        let pages: Vec<String> = transport
            .requested_urls()
            .into_iter()
            .filter(|url| url.starts_with(API))
            .collect();
        assert_eq!(pages, vec![page_url(3), page_url(2), page_url(1)]);
        assert_eq!(transport.json_bodies(GATEWAY).len(), 3);
    }

    #[tokio::test]
    async fn test_delivered_threads_are_skipped() {
        let store = MemoryStore::new();
        store
            .write("forum-threads-11", "forum-threads-11")
            .await
            .unwrap();
        let transport = ScriptedTransport::new()
            .respond(&page_url(1), 200, &thread_page([11, 12]))
            .respond(GATEWAY, 200, "{}");
        let config = config(1, 1);

        let result = run(&config, &transport, &store).await;

        assert_eq!(result.delivered, 1);
        assert_eq!(result.suppressed, 1);
        assert!(store.read("forum-threads-12").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_force_redelivers() {
        let store = MemoryStore::new();
        store
            .write("forum-threads-11", "forum-threads-11")
            .await
            .unwrap();
        let transport = ScriptedTransport::new()
            .respond(&page_url(1), 200, &thread_page([11]))
            .respond(GATEWAY, 200, "{}");
        let mut config = config(1, 1);
        config.threads.as_mut().unwrap().force = true;

        let result = run(&config, &transport, &store).await;

        assert_eq!(result.delivered, 1);
    }

    #[tokio::test]
    async fn test_blocked_thread_is_not_flagged() {
        let store = MemoryStore::new();
        let transport = ScriptedTransport::new()
            .respond(&page_url(1), 200, &thread_page([11]))
            .respond(GATEWAY, 200, "{}");
        let mut config = config(1, 1);
        config.threads.as_mut().unwrap().keywords = KeywordRules {
            block_keywords: vec!["thread 11".into()],
            active_keywords: Vec::new(),
        };

        let result = run(&config, &transport, &store).await;

        assert_eq!(result.delivered, 0);
        assert_eq!(result.suppressed, 1);
        assert!(store.read("forum-threads-11").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_page_failure_aborts_feed() {
        let store = MemoryStore::new();
        let transport = ScriptedTransport::new()
            .respond(&page_url(2), 200, &thread_page([21]))
            .respond(&page_url(1), 503, "down")
            .respond(GATEWAY, 200, "{}");
        let config = config(2, 1);

        let result = run(&config, &transport, &store).await;

        assert!(matches!(result.error, Some(AppError::Fetch { .. })));
        assert_eq!(result.delivered, 1);
        assert!(store.read("forum-threads-21").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_thread_unflagged() {
        let store = MemoryStore::new();
        let transport = ScriptedTransport::new()
            .respond(&page_url(1), 200, &thread_page([11, 12]))
            .respond(GATEWAY, 500, "boom");
        let config = config(1, 1);

        let result = run(&config, &transport, &store).await;

        assert!(matches!(result.error, Some(AppError::Dispatch { .. })));
        assert_eq!(transport.json_bodies(GATEWAY).len(), 1);
        assert!(store.read("forum-threads-11").await.unwrap().is_none());
    }
}
