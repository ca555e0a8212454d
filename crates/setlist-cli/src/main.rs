// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use setlist_application::{ChunkProcessor, PipelineDriver, RetryPolicy, SourceIterator};
use setlist_config::AppConfig;
use setlist_domain::PipelineState;
use setlist_infrastructure::LedgerStore;
use setlist_media::{MediaFetcher, RateLimiter};
use setlist_recognition::RecognitionClient;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Recognize the songs inside a long-form audio source and keep a
/// deduplicated ledger of everything found.
#[derive(Debug, Parser)]
#[command(name = "setlist", version)]
struct Cli {
    /// Media reference to process: a single item or a collection.
    reference: String,

    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = setlist_config::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config.telemetry.log_level);

    std::fs::create_dir_all(&config.workspace.work_dir).with_context(|| {
        format!(
            "failed to create work directory {}",
            config.workspace.work_dir.display()
        )
    })?;

    let state = PipelineState::new();
    {
        let state = state.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            state.shutdown();
        });
    }

    let store = LedgerStore::new(config.workspace.ledger_path());
    let mut ledger = store.load();

    let iterator = build_iterator(&config)?;
    let outcome = iterator
        .run(&cli.reference, &mut ledger, &store, &state)
        .await;

    // Best-effort persistence on every terminal outcome; a no-op if an
    // interrupt already flipped the state.
    store.flush(&ledger, &state);

    match &outcome {
        Ok(()) if state.is_active() => {
            info!(target: "cli", "processing complete, total songs in ledger: {}", ledger.len())
        }
        Ok(()) => info!(target: "cli", "stopped by user, total songs in ledger: {}", ledger.len()),
        Err(e) => warn!(target: "cli", "run failed: {:#}", e),
    }

    outcome
}

fn build_iterator(config: &AppConfig) -> Result<SourceIterator> {
    let mut builder = RecognitionClient::builder(
        config.recognition.api_token.clone().unwrap_or_default(),
    )
    .timeout(Duration::from_secs(config.recognition.timeout_secs));
    if let Some(base_url) = &config.recognition.base_url {
        builder = builder.base_url(base_url);
    }
    let client = builder.build().context("failed to build recognition client")?;

    let processor = ChunkProcessor::new(
        client,
        &config.workspace.work_dir,
        RetryPolicy::new(
            config.pipeline.max_attempts,
            Duration::from_secs(config.pipeline.retry_pause_secs),
        ),
    );
    let store = LedgerStore::new(config.workspace.ledger_path());
    let driver = PipelineDriver::new(
        processor,
        store,
        config.pipeline.reclaim_every_windows,
        Duration::from_secs(config.pipeline.reclaim_after_secs),
    );
    let fetcher = MediaFetcher::new(&config.media.yt_dlp_path, &config.workspace.work_dir);
    let pacing = RateLimiter::new(Duration::from_secs(config.media.fetch_interval_secs));

    Ok(SourceIterator::new(fetcher, driver, pacing))
}

fn init_tracing(log_level: &str) {
    let fmt_layer = fmt::layer().with_target(true).with_level(true);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let mut interrupt = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
        .expect("install SIGINT handler");

    #[cfg(unix)]
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("install SIGTERM handler");

    #[cfg(not(unix))]
    let interrupt = tokio::signal::ctrl_c();

    #[cfg(unix)]
    tokio::select! {
        _ = interrupt.recv() => {},
        _ = terminate.recv() => {},
    }

    #[cfg(not(unix))]
    {
        interrupt.await.expect("ctrl_c handler");
    }

    info!(target: "cli", "shutdown signal received");
}
