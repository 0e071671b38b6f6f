// src/lambda/mod.rs

//! AWS Lambda handler for scheduled feed runs.
//!
//! Each invocation:
//! 1. Loads the TOML configuration from `CONFIG_PATH`
//! 2. Opens the S3-backed state store
//! 3. Runs the requested feeds once
//! 4. Returns one completion object summarizing every feed

use std::sync::Arc;

use lambda_runtime::{Error as LambdaError, LambdaEvent};

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::{AppError, Result};
use crate::models::{Config, RunReport};
use crate::pipeline::Pipeline;
use crate::storage::s3::S3Storage;
use crate::utils::http::ReqwestTransport;

/// Feeds covered by one invocation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedScope {
    #[default]
    All,
    Channels,
    Threads,
}

/// Lambda invocation payload. Scheduler events carry no fields.
#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub feeds: FeedScope,

    /// Deliver threads even when already flagged
    #[serde(default)]
    pub force: bool,
}

/// Failure of a single feed.
#[derive(Debug, Serialize)]
pub struct FeedFailure {
    pub feed: String,
    pub error: String,
}

/// Lambda response payload.
#[derive(Debug, Default, Serialize)]
pub struct RunResponse {
    /// Whether every feed completed
    pub success: bool,

    /// Number of feeds run
    pub feeds: usize,

    /// Number of items accepted by the gateway
    pub delivered: usize,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FeedFailure>,

    /// Configuration or setup error, if the run never started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl From<&RunReport> for RunResponse {
    fn from(report: &RunReport) -> Self {
        Self {
            success: report.is_success(),
            feeds: report.results.len(),
            delivered: report.delivered(),
            failures: report
                .failures()
                .map(|result| FeedFailure {
                    feed: result.feed_id.clone(),
                    error: result
                        .error
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                })
                .collect(),
            error: None,
            execution_time_ms: (report.finished_at - report.started_at)
                .num_milliseconds()
                .max(0) as u64,
        }
    }
}

impl RunResponse {
    /// Response for a run that never reached the feeds.
    pub fn aborted(error: &AppError, execution_time_ms: u64) -> Self {
        Self {
            success: false,
            error: Some(if error.is_fatal() {
                format!("fatal: {error}")
            } else {
                error.to_string()
            }),
            execution_time_ms,
            ..Default::default()
        }
    }
}

/// Main Lambda handler function.
#[instrument(skip(event))]
pub async fn handler(event: LambdaEvent<RunRequest>) -> std::result::Result<RunResponse, LambdaError> {
    let start = std::time::Instant::now();
    let (request, _context) = event.into_parts();

    info!("Starting run: feeds={:?}, force={}", request.feeds, request.force);

    match run(&request).await {
        Ok(report) => {
            let response = RunResponse::from(&report);
            if response.success {
                info!(
                    "Run completed: {} feed(s), {} delivered in {}ms",
                    response.feeds, response.delivered, response.execution_time_ms
                );
            } else {
                error!("Run completed with {} failed feed(s)", response.failures.len());
            }
            Ok(response)
        }
        Err(e) => {
            if e.is_fatal() {
                error!("Configuration rejected, no feed was run: {}", e);
            } else {
                error!("Run failed: {}", e);
            }
            Ok(RunResponse::aborted(&e, start.elapsed().as_millis() as u64))
        }
    }
}

async fn run(request: &RunRequest) -> Result<RunReport> {
    let config = load_lambda_config(request)?;
    let transport = ReqwestTransport::from_config(&config.http)?;
    let store = S3Storage::from_env().await?;

    let pipeline = Pipeline::new(config, Arc::new(transport), Arc::new(store));
    match request.feeds {
        FeedScope::All => pipeline.run().await,
        FeedScope::Channels => pipeline.run_channels().await,
        FeedScope::Threads => pipeline.run_threads().await,
    }
}

/// Load configuration from `CONFIG_PATH` and apply request overrides.
fn load_lambda_config(request: &RunRequest) -> Result<Config> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let mut config = Config::load(&path)?;

    if request.force {
        if let Some(threads) = config.threads.as_mut() {
            threads.force = true;
        }
    }

    if let Ok(delay) = std::env::var("REQUEST_DELAY_MS") {
        if let Ok(ms) = delay.parse() {
            config.http.request_delay_ms = ms;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunResult;
    use chrono::{Duration, Utc};

    #[test]
    fn test_run_request_defaults() {
        let req: RunRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.feeds, FeedScope::All);
        assert!(!req.force);
    }

    #[test]
    fn test_run_request_with_options() {
        let json = r#"{"feeds": "threads", "force": true}"#;
        let req: RunRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.feeds, FeedScope::Threads);
        assert!(req.force);
    }

    #[test]
    fn test_scheduler_event_is_accepted() {
        let json = r#"{"version": "0", "source": "aws.events", "detail": {}}"#;
        let req: RunRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.feeds, FeedScope::All);
    }

    #[test]
    fn test_aborted_response_marks_configuration_errors() {
        let response = RunResponse::aborted(&AppError::config("gateway.url is required"), 3);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["feeds"], 0);
        assert!(json["error"].as_str().unwrap().starts_with("fatal: "));

        let storage = AppError::Storage("bucket missing".into());
        assert!(!RunResponse::aborted(&storage, 3).error.unwrap().starts_with("fatal"));
    }

    #[test]
    fn test_response_lists_failed_feeds() {
        let started_at = Utc::now();
        let mut ok = RunResult::new("alpha");
        ok.delivered = 3;
        let report = RunReport {
            started_at,
            finished_at: started_at + Duration::milliseconds(250),
            results: vec![
                ok,
                RunResult::new("beta").failed(AppError::dispatch("beta", Some(500), None)),
            ],
        };

        let response = RunResponse::from(&report);
        let json = serde_json::to_value(&response).unwrap();

        assert!(!response.success);
        assert_eq!(json["delivered"], 3);
        assert_eq!(json["feeds"], 2);
        assert_eq!(json["failures"][0]["feed"], "beta");
        assert_eq!(json["execution_time_ms"], 250);
        assert!(json.get("error").is_none());
    }
}
