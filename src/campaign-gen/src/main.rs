//! Campaign generator: validates audience targeting against LinkedIn and
//! Google Ads constraints and produces ready-to-launch campaign structures.
//!
//! Main entry point that wires the service and starts the HTTP server.

use campaign_api::ApiServer;
use campaign_core::config::AppConfig;
use campaign_generation::CampaignService;
use campaign_store::InMemoryStore;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "campaign-gen")]
#[command(about = "Audience targeting validation and campaign structure generation")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "CAMPAIGN_GEN__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "CAMPAIGN_GEN__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Metrics exporter port (overrides config)
    #[arg(long, env = "CAMPAIGN_GEN__METRICS__PORT")]
    metrics_port: Option<u16>,

    /// Generation deadline in milliseconds (overrides config)
    #[arg(long, env = "CAMPAIGN_GEN__GENERATION__DEADLINE_MS")]
    deadline_ms: Option<u64>,

    /// Do not start the Prometheus exporter
    #[arg(long, default_value_t = false)]
    no_metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campaign_gen=info,campaign_generation=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Campaign generator starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }
    if let Some(deadline_ms) = cli.deadline_ms {
        config.generation.deadline_ms = deadline_ms;
    }
    config.validate()?;

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        deadline_ms = config.generation.deadline_ms,
        "Configuration loaded"
    );

    let store = Arc::new(InMemoryStore::new());
    let service = Arc::new(CampaignService::with_defaults(&config, store));
    let api_server = ApiServer::new(config.clone(), service.clone());

    if cli.no_metrics {
        info!("Metrics exporter disabled");
    } else if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    // Validation cache maintenance
    let maintenance = service.clone();
    let ttl = Duration::from_secs(config.cache.ttl_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(ttl);
        loop {
            interval.tick().await;
            let evicted = maintenance.maintenance();
            if evicted > 0 {
                debug!(evicted, "Expired validation reports evicted");
            }
        }
    });

    info!("Campaign generator is ready to serve traffic");

    api_server.start_http().await?;

    Ok(())
}
