// src/utils/log.rs

//! Server-style log helpers layered on the `log` facade.
//!
//! The binaries decide where records go (`env_logger` for the CLI,
//! `tracing-subscriber` for Lambda); these helpers only shape the text.

use crate::models::RunReport;

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        log::info!("    {}: {}", key, value);
    }
}

/// Log the outcome of a run, one line per failed feed.
pub fn run_report(report: &RunReport) {
    let elapsed = report.finished_at - report.started_at;
    let failed = report.failures().count();

    summary(
        "Run finished",
        &[
            ("feeds", report.results.len().to_string()),
            ("delivered", report.delivered().to_string()),
            ("failed feeds", failed.to_string()),
            ("elapsed", format!("{}ms", elapsed.num_milliseconds())),
        ],
    );

    for result in report.failures() {
        if let Some(error) = &result.error {
            log::error!("    {}: {}", result.feed_id, error);
        }
    }
}
