// src/pipeline/runner.rs

//! Run orchestration across all configured feeds.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;

use crate::error::Result;
use crate::models::{Config, RunReport, RunResult};
use crate::services::Dispatcher;
use crate::storage::KvStore;
use crate::utils::http::Transport;

use super::channels::run_channel_feed;
use super::threads::run_thread_feed;

/// Shared collaborators borrowed by every feed pipeline of a run.
pub struct FeedContext<'a> {
    pub config: &'a Config,
    pub transport: &'a dyn Transport,
    pub store: &'a dyn KvStore,
}

impl<'a> FeedContext<'a> {
    pub fn new(config: &'a Config, transport: &'a dyn Transport, store: &'a dyn KvStore) -> Self {
        Self {
            config,
            transport,
            store,
        }
    }

    pub fn dispatcher(&self) -> Dispatcher<'a> {
        Dispatcher::new(
            self.config.gateway_url(),
            &self.config.providers,
            self.transport,
        )
    }

    /// Pause between page requests of one feed.
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.config.http.request_delay_ms)
    }
}

/// Which feeds a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    All,
    Channels,
    Threads,
}

/// Polls every configured feed once and reports per-feed outcomes.
///
/// Feeds run concurrently on the calling task; one feed failing never
/// stops the others.
pub struct Pipeline {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn KvStore>,
}

impl Pipeline {
    pub fn new(config: Config, transport: Arc<dyn Transport>, store: Arc<dyn KvStore>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            store,
        }
    }

    /// Run channel feeds and the thread feed.
    ///
    /// Returns `Err` only for configuration errors, before any request.
    pub async fn run(&self) -> Result<RunReport> {
        self.run_scope(Scope::All).await
    }

    /// Run the channel feeds only.
    pub async fn run_channels(&self) -> Result<RunReport> {
        self.run_scope(Scope::Channels).await
    }

    /// Run the thread feed only.
    pub async fn run_threads(&self) -> Result<RunReport> {
        self.run_scope(Scope::Threads).await
    }

    async fn run_scope(&self, scope: Scope) -> Result<RunReport> {
        self.config.validate()?;
        crate::utils::log::header("Feed run starting");

        let started_at = Utc::now();
        let ctx = FeedContext::new(&self.config, self.transport.as_ref(), self.store.as_ref());

        let channels = self
            .config
            .channels
            .as_ref()
            .filter(|_| scope != Scope::Threads);
        let threads = self
            .config
            .threads
            .as_ref()
            .filter(|_| scope != Scope::Channels);

        let channel_runs = join_all(
            channels
                .into_iter()
                .flat_map(|config| config.ids.iter().map(move |channel| (config, channel)))
                .map(|(config, channel)| run_channel_feed(&ctx, config, channel)),
        );
        let thread_run = async {
            match threads {
                Some(config) => Some(run_thread_feed(&ctx, config).await),
                None => None,
            }
        };

        let (mut results, thread_result): (Vec<RunResult>, Option<RunResult>) =
            futures::join!(channel_runs, thread_run);
        results.extend(thread_result);

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            results,
        };
        crate::utils::log::run_report(&report);
        Ok(report)
    }
}
