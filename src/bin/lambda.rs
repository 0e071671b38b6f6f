//! AWS Lambda entry point for feedcast
//!
//! Deploy with `cargo lambda build --release --features lambda`
//! and trigger it from an EventBridge schedule.

use feedcast::lambda::handler;
use lambda_runtime::{Error as LambdaError, service_fn};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the AWS Lambda function.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("feedcast Lambda starting...");
    lambda_runtime::run(service_fn(handler)).await
}
