//! Run outcome reporting.

use chrono::{DateTime, Utc};

use crate::error::AppError;

/// Outcome of one feed pipeline.
#[derive(Debug)]
pub struct RunResult {
    pub feed_id: String,

    /// Items accepted by the gateway during this run
    pub delivered: usize,

    /// Items dropped by the delivery filter
    pub suppressed: usize,

    pub error: Option<AppError>,
}

impl RunResult {
    pub fn new(feed_id: impl Into<String>) -> Self {
        Self {
            feed_id: feed_id.into(),
            delivered: 0,
            suppressed: 0,
            error: None,
        }
    }

    pub fn failed(mut self, error: AppError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate outcome of a run across all feeds.
#[derive(Debug)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<RunResult>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.results.iter().all(RunResult::is_success)
    }

    pub fn delivered(&self) -> usize {
        self.results.iter().map(|r| r.delivered).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RunResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn result_for(&self, feed_id: &str) -> Option<&RunResult> {
        self.results.iter().find(|r| r.feed_id == feed_id)
    }
}
