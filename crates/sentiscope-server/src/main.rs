//! Sentiscope
//!
//! Serves per-language sentiment classifiers over HTTP. Models are loaded on
//! first use for each language and kept for the life of the process.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use sentiscope_server::cli::Cli;
use sentiscope_server::{run_server, AppState, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting Sentiscope");

    let config = ServerConfig::load(&cli.config, &cli)?;
    info!("Configuration loaded successfully");
    info!("Inference device: {}", config.inference.device);

    let metrics_handle = init_metrics()?;

    let state = AppState::from_config(&config, Some(metrics_handle)).await?;

    let addr = config.socket_addr()?;
    run_server(state, addr).await
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(env_filter(verbose, std::env::var("RUST_LOG").ok().as_deref()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// `RUST_LOG` wins when set and valid; `--verbose` only raises the default
fn env_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let default = if verbose {
        "sentiscope=debug,tower_http=debug"
    } else {
        "sentiscope=info,tower_http=warn"
    };

    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}

/// Install the Prometheus recorder and return the handle `/metrics` renders
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "sentiscope_requests_total",
        "Total number of classification requests"
    );
    metrics::describe_counter!(
        "sentiscope_classification_errors_total",
        "Failed classification requests by error kind"
    );
    metrics::describe_counter!(
        "sentiscope_model_loads_total",
        "Model construction attempts by language and outcome"
    );
    metrics::describe_histogram!(
        "sentiscope_classification_latency_us",
        metrics::Unit::Microseconds,
        "Classification latency in microseconds by language"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
