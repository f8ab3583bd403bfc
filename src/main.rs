// src/main.rs

use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use notion2report::config::{CommandLineInput, SyncConfig};
use notion2report::ingest::{run_sync, SyncOutcome};
use notion2report::report::{compose, summary};
use notion2report::store::CacheStore;
use notion2report::{AppError, NotionHttpClient};
use std::fs;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let log_file_path = std::env::temp_dir().join("notion2report.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stdout_appender = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::debug!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Executes the pipeline: sync the mirror, digest it, optionally compose
/// a period report.
async fn execute(config: &SyncConfig) -> Result<(), AppError> {
    let store = CacheStore::new(config.cache_path())
        .with_json_mirror(config.json_mirror_path());

    if config.skip_fetch {
        println!("⏭  Skipping sync, working from the existing cache store.");
    } else {
        let client = NotionHttpClient::new(&config.api_key)?;
        let outcome = run_sync(&client, config, &store).await?;
        report_sync_outcome(&outcome, &store);
    }

    let records = store.load()?;
    if records.is_empty() {
        println!("ℹ️  The cache store is empty — nothing to analyze.");
        return Ok(());
    }

    let today = chrono::Local::now().date_naive();
    summary::write_digest(&records, &config.analysis_path(), today)?;
    println!("✓ Analysis digest saved to {}", config.analysis_path().display());

    if config.report.is_some() {
        let path = compose::write_report(&records, config, today)?;
        println!("✓ Report saved to {}", path.display());
    }

    Ok(())
}

/// Reports sync results to the user with stats and absorbed warnings.
fn report_sync_outcome(outcome: &SyncOutcome, store: &CacheStore) {
    if outcome.assembled > 0 {
        println!(
            "✔️  Saved {} new/updated tasks to {} ({} rows total).",
            outcome.assembled,
            store.path().display(),
            outcome.store_rows
        );
    } else {
        println!("ℹ️  No new or updated tasks to save.");
    }
    if outcome.skipped > 0 {
        println!("   {} tasks unchanged since the last run.", outcome.skipped);
    }
    if outcome.failed > 0 {
        eprintln!(
            "⚠️  {} records failed to assemble and were left at their cached state.",
            outcome.failed
        );
    }
    for warning in &outcome.warnings {
        log::warn!("Sync warning: {}", warning);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose).map_err(|e| anyhow::anyhow!("logging setup failed: {}", e))?;

    let config = SyncConfig::resolve(cli)?;

    execute(&config).await?;

    Ok(())
}
