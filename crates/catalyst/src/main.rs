use std::io::Read;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use catalyst::daemon::Daemon;
use catalyst::build_pipeline;
use catalyst_models::{CatalystConfig, NewsItem};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "catalyst", about = "Automated stock-catalyst trading pipeline")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/catalyst.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest NDJSON NewsItems from stdin and run the full classify/trade/monitor daemon.
    Run {
        /// Number of concurrent classifier workers.
        #[arg(long, default_value_t = 4)]
        workers: usize,
    },
    /// Classify, score, and (paper-)trade a single NewsItem JSON read from stdin.
    Classify,
    /// Run one Missed-Opportunities Analyzer sweep and persist its recommendations.
    Moa,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Command::Run { workers } => run_daemon(config, workers).await?,
        Command::Classify => run_classify_once(config).await?,
        Command::Moa => run_moa(config).await?,
    }

    Ok(())
}

fn load_config(path: &str) -> Result<CatalystConfig> {
    match std::fs::read_to_string(path) {
        Ok(raw) => toml::from_str(&raw).with_context(|| format!("failed to parse config: {path}")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path, "config file not found, using built-in defaults");
            Ok(CatalystConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("failed to read config: {path}")),
    }
}

async fn run_daemon(config: CatalystConfig, workers: usize) -> Result<()> {
    let pipeline = Arc::new(build_pipeline(config).context("failed to build pipeline")?);
    let daemon = Arc::new(Daemon::new(pipeline));
    let cancel = daemon.cancel_token();

    let (tx, rx) = mpsc::channel::<NewsItem>(256);

    let ingest_handle = tokio::spawn(async move {
        let stdin = tokio::io::stdin();
        match catalyst::ingest::ingest_ndjson(stdin, tx).await {
            Ok(count) => tracing::info!(count, "stdin ingest finished"),
            Err(e) => tracing::error!(error = %e, "stdin ingest failed"),
        }
    });

    let daemon_for_run = daemon.clone();
    let run_handle = tokio::spawn(async move { daemon_for_run.run(rx, workers).await });

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    tracing::info!("received ctrl-c, shutting down");
    cancel.cancel();

    ingest_handle.abort();
    run_handle.await.context("daemon task panicked")??;
    Ok(())
}

async fn run_classify_once(config: CatalystConfig) -> Result<()> {
    let pipeline = build_pipeline(config).context("failed to build pipeline")?;

    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read NewsItem JSON from stdin")?;
    let item: NewsItem = serde_json::from_str(buf.trim()).context("failed to parse NewsItem JSON")?;

    pipeline.process(item).await?;
    println!("processed");
    Ok(())
}

async fn run_moa(config: CatalystConfig) -> Result<()> {
    let pipeline = build_pipeline(config).context("failed to build pipeline")?;
    let outcome = catalyst::daemon::run_moa_once(&pipeline).await?;

    let summary = serde_json::json!({
        "rows_considered": outcome.rows_considered,
        "missed_opportunities": outcome.missed_opportunities,
        "recommendations": outcome.recommendations.len(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
