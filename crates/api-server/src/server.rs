//! API server: HTTP routes over the campaign service plus the Prometheus
//! metrics exporter.

use crate::rest::{self, AppState};
use axum::routing::{get, post, put};
use axum::Router;
use campaign_core::config::AppConfig;
use campaign_generation::CampaignService;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ApiServer {
    config: AppConfig,
    service: Arc<CampaignService>,
}

impl ApiServer {
    pub fn new(config: AppConfig, service: Arc<CampaignService>) -> Self {
        Self { config, service }
    }

    pub fn router(&self) -> Router {
        let state = AppState::new(self.service.clone(), self.config.node_id.clone());

        Router::new()
            // Campaign generation
            .route("/api/v1/campaigns/generate", post(rest::generate_campaign))
            .route("/api/v1/campaigns/:id", get(rest::get_campaign))
            .route("/api/v1/campaigns/:id/targeting", put(rest::update_targeting))
            .route("/api/v1/generations", post(rest::start_generation))
            .route("/api/v1/generations/:id", get(rest::generation_progress))
            // Targeting and segments
            .route("/api/v1/targeting/validate", post(rest::validate_rules))
            .route("/api/v1/segments", post(rest::create_segment))
            .route("/api/v1/segments/:id", get(rest::get_segment))
            .route("/api/v1/segments/:id/optimize", post(rest::optimize_segment))
            .route("/api/v1/segments/:id/sync", post(rest::sync_segment))
            // Operational endpoints
            .route("/health", get(rest::health_check))
            .route("/live", get(rest::liveness))
            // Middleware
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = self.router();
        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
