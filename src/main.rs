// SPDX-License-Identifier: MPL-2.0

//! Headless throughput monitor
//!
//! Runs the dashboard and network-traffic contexts side by side against the
//! configured counter source until interrupted.

use clap::Parser;
use netrate_monitor::config::{Config, SourceConfig, DEFAULT_HTTP_TIMEOUT_MS};
use netrate_monitor::poller::{self, JsonLinesSink, LogSink, RateSink};
use netrate_monitor::source::Source;
use netrate_monitor::traffic::TrafficContext;
use std::path::PathBuf;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Poll this appliance URL instead of the configured source
    #[arg(long)]
    url: Option<String>,

    /// Interface for both contexts (overrides the config)
    #[arg(short, long)]
    interface: Option<String>,

    /// Emit samples as JSON lines on stdout instead of logging them
    #[arg(long)]
    json: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn sink(json: bool) -> Box<dyn RateSink> {
    if json {
        Box::new(JsonLinesSink::stdout())
    } else {
        Box::new(LogSink)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(url) = cli.url {
        config.source = SourceConfig::Http {
            url,
            timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
        };
    }
    if let Some(interface) = cli.interface {
        config.dashboard.interface = Some(interface.clone());
        config.network.interface = Some(interface);
    }
    config.validate()?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let mut dashboard = TrafficContext::new("dashboard", &config.dashboard);
    let mut network = TrafficContext::new("network", &config.network);
    let mut dashboard_source = Source::from_config(&config.source)?;
    let mut network_source = Source::from_config(&config.source)?;
    let mut dashboard_sink = sink(cli.json);
    let mut network_sink = sink(cli.json);

    log::info!(
        "Reading counters from {} (config v{})",
        dashboard_source.describe(),
        Config::VERSION
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Interrupted, shutting down");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                log::error!("Failed to listen for Ctrl-C: {}", e);
                // Keep the sender alive so the pollers keep running.
                let _keep = shutdown_tx;
                std::future::pending::<()>().await;
            }
        }
    });

    futures_util::future::join(
        poller::run(
            &mut dashboard,
            &mut dashboard_source,
            dashboard_sink.as_mut(),
            config.dashboard.poll_interval(),
            shutdown_rx.clone(),
        ),
        poller::run(
            &mut network,
            &mut network_source,
            network_sink.as_mut(),
            config.network.poll_interval(),
            shutdown_rx,
        ),
    )
    .await;

    Ok(())
}
