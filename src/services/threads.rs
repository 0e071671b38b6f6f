// src/services/threads.rs

//! Thread collector: page-index walk over the forum listing API.

use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CandidateItem, ThreadsConfig};
use crate::services::extract::parse_thread_page;
use crate::utils::http::{HttpRequest, Transport};
use crate::utils::page_range;

/// Service fetching thread listing pages by explicit page number.
pub struct ThreadCollector<'a> {
    config: &'a ThreadsConfig,
    transport: &'a dyn Transport,
    feed_id: String,
}

impl<'a> ThreadCollector<'a> {
    pub fn new(config: &'a ThreadsConfig, transport: &'a dyn Transport) -> Self {
        Self {
            config,
            transport,
            feed_id: config.feed_id(),
        }
    }

    pub fn feed_id(&self) -> &str {
        &self.feed_id
    }

    /// Page numbers in the order they are fetched.
    pub fn pages(&self) -> impl Iterator<Item = u32> + use<> {
        page_range(self.config.from, self.config.to)
    }

    fn page_url(&self, page: u32) -> Result<String> {
        let mut url = Url::parse(&self.config.api_url)?;
        {
            let mut query = url.query_pairs_mut();
            for fid in &self.config.forum_ids {
                query.append_pair("fid", fid);
            }
            query.append_pair("order_by", "lastpostdesc");
            query.append_pair("page", &page.to_string());
        }
        Ok(url.into())
    }

    /// Fetch one page and return its complete threads, group by group.
    ///
    /// Each group is cut to `max_per_page` first; threads without a posting
    /// time are then discarded.
    pub async fn fetch_page(&self, page: u32) -> Result<Vec<CandidateItem>> {
        let url = self.page_url(page)?;
        log::debug!("Fetching thread page {}", url);

        let request = HttpRequest::get(&url)
            .header("content-type", "application/json")
            .header("uid", &self.config.uid)
            .header("cid", &self.config.cid);

        let response = self
            .transport
            .call(request)
            .await
            .map_err(|e| AppError::fetch(&self.feed_id, None, e, None))?;

        if !response.is_success() {
            return Err(AppError::fetch(
                &self.feed_id,
                Some(response.status),
                format!("page {page} returned {}", response.status),
                response.body.as_deref(),
            ));
        }

        let body = response.body.unwrap_or_default();
        let mut items = Vec::new();
        for mut group in parse_thread_page(&self.feed_id, &body) {
            if let Some(max) = self.config.max_per_page {
                group.truncate(max);
            }
            items.extend(
                group
                    .into_iter()
                    .filter(|record| record.is_posted())
                    .map(|record| record.into_item(&self.feed_id)),
            );
        }

        log::info!(
            "Thread page {}: {} complete thread(s)",
            page,
            items.len()
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedTransport, thread_page};

    fn config() -> ThreadsConfig {
        ThreadsConfig {
            api_url: "https://forum.example.com/api/threads".into(),
            forum_ids: vec!["7".into(), "42".into()],
            uid: "u1".into(),
            cid: "c1".into(),
            ..ThreadsConfig::default()
        }
    }

    #[test]
    fn test_descending_range() {
        let config = ThreadsConfig {
            from: 3,
            to: 1,
            ..config()
        };
        let transport = ScriptedTransport::new();
        let pages: Vec<u32> = ThreadCollector::new(&config, &transport).pages().collect();
        assert_eq!(pages, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_request_shape() {
        let url = "https://forum.example.com/api/threads?fid=7&fid=42&order_by=lastpostdesc&page=2";
        let transport = ScriptedTransport::new().respond(url, 200, &thread_page([1, 2]));
        let config = config();
        let collector = ThreadCollector::new(&config, &transport);

        let items = collector.fetch_page(2).await.unwrap();

        assert_eq!(items.len(), 2);
        let request = &transport.requests()[0];
        assert_eq!(request.url, url);
        assert!(request.headers.contains(&("uid".into(), "u1".into())));
        assert!(request.headers.contains(&("cid".into(), "c1".into())));
    }

    #[tokio::test]
    async fn test_truncate_then_drop_unposted() {
        let body = r#"{"data": [
            {"threads": [
                {"tid": 1, "subject": "a", "postdate": 0},
                {"tid": 2, "subject": "b", "postdate": 1700000000},
                {"tid": 3, "subject": "c", "postdate": 1700000001}
            ]},
            {"threads": [
                {"tid": 4, "subject": "d", "postdate": 1700000002},
                {"tid": 5, "subject": "e", "postdate": 1700000003}
            ]}
        ]}"#;
        let transport = ScriptedTransport::new().fallback(move |_| (200, body.to_string()));
        let config = ThreadsConfig {
            max_per_page: Some(2),
            ..config()
        };
        let collector = ThreadCollector::new(&config, &transport);

        let items = collector.fetch_page(1).await.unwrap();

        let ids: Vec<u64> = items.iter().map(|i| i.item_id).collect();
        assert_eq!(ids, vec![2, 4, 5]);
    }

    #[tokio::test]
    async fn test_error_status_is_fetch_failure() {
        let transport = ScriptedTransport::new().fallback(|_| (403, "login required".into()));
        let config = config();
        let collector = ThreadCollector::new(&config, &transport);

        match collector.fetch_page(1).await {
            Err(AppError::Fetch {
                status, body, feed, ..
            }) => {
                assert_eq!(status, Some(403));
                assert_eq!(body, "login required");
                assert_eq!(feed, "forum-threads:7,42");
            }
            other => panic!("expected fetch failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_empty_page() {
        let transport = ScriptedTransport::new().fallback(|_| (200, "<html>maintenance</html>".into()));
        let config = config();
        let collector = ThreadCollector::new(&config, &transport);

        assert!(collector.fetch_page(1).await.unwrap().is_empty());
    }
}
