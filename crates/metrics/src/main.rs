//! PlayType metrics exporter
//!
//! `generate` converts the Playwright JSON report to a `.prom` file;
//! `serve` exposes that file to Prometheus.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info};

use playtype_metrics::generate::{resolve, write_metrics_file};
use playtype_metrics::{serve, MetricsServerConfig, DEFAULT_METRICS_PATH, DEFAULT_PORT, DEFAULT_REPORT_PATH};

#[derive(Parser)]
#[command(name = "playtype-metrics")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the exposition file from a JSON test report
    Generate {
        /// Playwright JSON report
        #[arg(long, default_value = DEFAULT_REPORT_PATH)]
        report: PathBuf,

        /// Output `.prom` file
        #[arg(long, default_value = DEFAULT_METRICS_PATH)]
        output: PathBuf,
    },

    /// Serve the exposition file at /metrics
    Serve {
        #[arg(long, env = "PLAYTYPE_METRICS_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Exposition file to serve
        #[arg(long, default_value = DEFAULT_METRICS_PATH)]
        metrics: PathBuf,

        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate { report, output } => {
            info!("Starting Prometheus metrics generation...");
            match write_metrics_file(&resolve(&report), &resolve(&output)) {
                Ok(_) => Ok(()),
                Err(e) => {
                    error!("Error generating metrics: {}", e);
                    if matches!(e, playtype_common::HarnessError::ReportNotFound(_)) {
                        info!("Run the tests with --reporter=json first");
                    }
                    Err(e.into())
                }
            }
        }
        Commands::Serve {
            port,
            metrics,
            host,
        } => {
            let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
            serve(
                addr,
                MetricsServerConfig {
                    metrics_path: resolve(&metrics),
                },
            )
            .await
        }
    }
}
