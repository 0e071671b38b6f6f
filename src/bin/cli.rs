//! feedcast CLI
//!
//! Local execution entry point. For AWS Lambda, use `feedcast-lambda`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use feedcast::{
    error::{AppError, Result},
    models::{Config, RunReport},
    pipeline::Pipeline,
    storage::{CursorStore, LocalStorage},
    utils::http::ReqwestTransport,
};

/// feedcast - channel and forum thread push relay
#[derive(Parser, Debug)]
#[command(
    name = "feedcast",
    version,
    about = "Polls channels and forum threads and pushes new items to a gateway"
)]
struct Cli {
    /// Path to storage directory containing config.toml and state.json
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every configured feed once
    Run,

    /// Run the channel feeds only
    Channels,

    /// Run the forum thread feed only
    Threads {
        /// First page to fetch
        #[arg(long)]
        from: Option<u32>,

        /// Last page to fetch
        #[arg(long)]
        to: Option<u32>,

        /// Deliver threads even if already delivered
        #[arg(long)]
        force: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Show or reset the cursor of a channel
    Cursor {
        /// Channel id
        feed: String,

        /// Overwrite the cursor with this item id
        #[arg(long)]
        reset: Option<u64>,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let mut config = Config::load_or_default(&config_path);
    log::info!("Loaded configuration from {}", config_path.display());

    let storage = LocalStorage::open(&cli.storage_dir).await?;

    let report = match cli.command {
        Command::Run => pipeline(config, storage)?.run().await?,

        Command::Channels => pipeline(config, storage)?.run_channels().await?,

        Command::Threads { from, to, force } => {
            let Some(threads) = config.threads.as_mut() else {
                return Err(AppError::config("No [threads] section configured"));
            };
            if let Some(from) = from {
                threads.from = from;
            }
            if let Some(to) = to {
                threads.to = to;
            }
            threads.force |= force;
            pipeline(config, storage)?.run_threads().await?
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("Config OK");
            return Ok(ExitCode::SUCCESS);
        }

        Command::Cursor { feed, reset } => {
            let cursors = CursorStore::new(&storage);
            if let Some(id) = reset {
                cursors.reset(&feed, id).await?;
                log::info!("Cursor for {} reset to {}", feed, id);
            } else {
                match cursors.load(&feed).await? {
                    Some(id) => log::info!("Cursor for {}: {}", feed, id),
                    None => log::info!("No cursor stored for {}", feed),
                }
            }
            log::info!("State file: {}", storage.state_path().display());
            return Ok(ExitCode::SUCCESS);
        }
    };

    Ok(exit_code(&report))
}

fn pipeline(config: Config, storage: LocalStorage) -> Result<Pipeline> {
    let transport = ReqwestTransport::from_config(&config.http)?;
    Ok(Pipeline::new(config, Arc::new(transport), Arc::new(storage)))
}

fn exit_code(report: &RunReport) -> ExitCode {
    if report.is_success() {
        log::info!("Done!");
        ExitCode::SUCCESS
    } else {
        log::error!("{} feed(s) failed", report.failures().count());
        ExitCode::FAILURE
    }
}
