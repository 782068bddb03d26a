use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use chart_version_monitor::config::{Config, DEFAULT_CONFIG_PATH};
use chart_version_monitor::logging::{LogFormat, init_tracing};
use chart_version_monitor::monitor::Monitor;
use chart_version_monitor::notify::webhook::WebhookNotifier;
use chart_version_monitor::version::fetcher::HttpIndexFetcher;

#[derive(Parser)]
#[command(name = "chart-version-monitor")]
#[command(version, about = "Reports new Helm chart versions to a webhook")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Write logs to this file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Run a single poll cycle, print the highest versions and exit
    #[arg(long)]
    once: bool,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli.config)
        .with_context(|| format!("invalid configuration ({})", cli.config.display()))?;
    info!("{}", config.summary());

    let fetcher = HttpIndexFetcher::new(config.fetch_timeout.as_duration())
        .context("failed to create index fetcher")?;
    let notifier = WebhookNotifier::new(&config.webhook_url, config.notify_timeout.as_duration())
        .context("failed to create webhook notifier")?;
    let monitor = Monitor::new(config, Arc::new(fetcher), Arc::new(notifier));

    if cli.once {
        let tracker = monitor.poll_once().await?;
        if tracker.is_empty() {
            warn!("No versions found for any watched chart");
        }
        for (key, version) in tracker.snapshot() {
            println!("{}\t{}\t{}", key.repository, key.chart, version);
        }
        return Ok(());
    }

    info!("Helmchart monitor started");
    monitor.run_until(shutdown_signal()).await?;
    info!("Helmchart monitor stopped");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_format, cli.log_file.as_deref())?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}
