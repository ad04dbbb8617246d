//! REST handlers for campaign generation, targeting validation, segment
//! management and operational endpoints.

use crate::error::ApiError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use campaign_core::types::{
    AudienceSegment, Campaign, GenerationRequest, OptimizationSettings, Platform, ProcessingStatus, TargetingInput,
    TargetingRule,
};
use campaign_generation::{CampaignService, GenerationProgress};
use campaign_targeting::RuleValidation;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

/// Progress of generations still in flight, keyed by campaign id.
pub type GenerationRegistry = DashMap<Uuid, watch::Receiver<GenerationProgress>>;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CampaignService>,
    pub generations: Arc<GenerationRegistry>,
    pub node_id: String,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: Arc<CampaignService>, node_id: impl Into<String>) -> Self {
        Self {
            service,
            generations: Arc::new(DashMap::new()),
            node_id: node_id.into(),
            start_time: Instant::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ValidateRulesRequest {
    pub platform: Platform,
    pub rules: Vec<TargetingRule>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSegmentRequest {
    pub platform: Platform,
    pub targeting: TargetingInput,
}

#[derive(Debug, Deserialize)]
pub struct SyncSegmentRequest {
    pub platform: Platform,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
    pub generations_in_flight: usize,
}

// ─── Campaigns ─────────────────────────────────────────────────────────────

/// POST /api/v1/campaigns/generate: blocks until the campaign is committed
/// or the generation fails.
pub async fn generate_campaign(
    State(state): State<AppState>,
    Json(req): Json<GenerationRequest>,
) -> Result<(StatusCode, Json<Campaign>), ApiError> {
    let campaign = state
        .service
        .generate_campaign_structure(req.platform_type, req.targeting, req.budget, req.date_range)
        .await?;
    metrics::counter!("api.campaigns.generated").increment(1);
    Ok((StatusCode::CREATED, Json(campaign)))
}

pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Campaign>, ApiError> {
    Ok(Json(state.service.get_campaign(id).await?))
}

pub async fn update_targeting(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(targeting): Json<TargetingInput>,
) -> Result<Json<Campaign>, ApiError> {
    Ok(Json(state.service.update_targeting(id, targeting).await?))
}

// ─── Asynchronous generation ───────────────────────────────────────────────

/// POST /api/v1/generations: accepts the request and returns its initial
/// progress; poll `GET /api/v1/generations/:id` for the outcome.
pub async fn start_generation(
    State(state): State<AppState>,
    Json(req): Json<GenerationRequest>,
) -> (StatusCode, Json<GenerationProgress>) {
    let handle = state.service.start_generation(req);
    let id = handle.campaign_id();
    let progress = handle.progress();
    state.generations.insert(id, handle.subscribe());

    let generations = state.generations.clone();
    tokio::spawn(async move {
        if let Err(e) = handle.wait().await {
            debug!(campaign_id = %id, error = %e, "Background generation failed");
        }
        generations.remove(&id);
    });

    metrics::counter!("api.generations.accepted").increment(1);
    (StatusCode::ACCEPTED, Json(progress))
}

pub async fn generation_progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GenerationProgress>, ApiError> {
    let live = state.generations.get(&id).map(|rx| rx.borrow().clone());
    if let Some(progress) = live {
        return Ok(Json(progress));
    }
    let campaign = state.service.get_campaign(id).await?;
    Ok(Json(settled_progress(&campaign)))
}

/// Progress of a generation that is no longer running, from its stored record.
fn settled_progress(campaign: &Campaign) -> GenerationProgress {
    let percent = match campaign.processing_status {
        ProcessingStatus::Completed => 100,
        ProcessingStatus::Queued => 0,
        ProcessingStatus::Processing | ProcessingStatus::Failed => 99,
    };
    GenerationProgress {
        campaign_id: campaign.id,
        status: campaign.processing_status,
        percent,
        elapsed_ms: (campaign.updated_at - campaign.created_at).num_milliseconds().max(0) as u64,
        error: campaign.failure.as_ref().map(|f| f.code),
    }
}

// ─── Targeting & segments ──────────────────────────────────────────────────

pub async fn validate_rules(
    State(state): State<AppState>,
    Json(req): Json<ValidateRulesRequest>,
) -> Result<Json<RuleValidation>, ApiError> {
    Ok(Json(state.service.validate_rules(&req.rules, req.platform)?))
}

pub async fn create_segment(
    State(state): State<AppState>,
    Json(req): Json<CreateSegmentRequest>,
) -> Result<(StatusCode, Json<AudienceSegment>), ApiError> {
    let segment = state.service.create_segment(req.targeting, req.platform).await?;
    Ok((StatusCode::CREATED, Json(segment)))
}

pub async fn get_segment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AudienceSegment>, ApiError> {
    Ok(Json(state.service.get_segment(id).await?))
}

pub async fn optimize_segment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(settings): Json<OptimizationSettings>,
) -> Result<Json<AudienceSegment>, ApiError> {
    let segment = state.service.optimize_segment(id, settings).await?;
    info!(segment_id = %id, rules = segment.targeting_rules.len(), "Segment optimized via API");
    Ok(Json(segment))
}

pub async fn sync_segment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SyncSegmentRequest>,
) -> Result<(StatusCode, Json<AudienceSegment>), ApiError> {
    let segment = state.service.sync_segment(id, req.platform).await?;
    Ok((StatusCode::CREATED, Json(segment)))
}

// ─── Operational ───────────────────────────────────────────────────────────

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        generations_in_flight: state.generations.len(),
    })
}

/// GET /live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
