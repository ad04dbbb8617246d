//! Campaign generation pipeline.
//!
//! Stages run in order: input validation, segment validation per platform,
//! structure assembly (with the platform adapter check) and commit. Nothing
//! is written until every validation stage has passed; every write is
//! journaled so the supervisor can undo a run that fails or times out.

use crate::instrument::timed;
use crate::journal::CommitJournal;
use crate::retry::RetryPolicy;
use crate::structure::{PlatformAdapter, StructureAssembler};
use campaign_core::types::{
    AudienceSegment, Campaign, GenerationRequest, PlatformSettings, PlatformType, ProcessingStatus, TargetingInput,
    TargetingSettings,
};
use campaign_core::{CampaignError, CampaignResult, ValidationCode, ValidationIssue};
use campaign_store::CampaignRepository;
use campaign_targeting::{SegmentBuilder, SegmentValidator};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Per-run state shared between the orchestrator and its supervisor.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub campaign_id: Uuid,
    pub accepted_at: DateTime<Utc>,
    pub deadline: Instant,
    pub journal: Arc<CommitJournal>,
}

impl GenerationContext {
    pub fn new(campaign_id: Uuid, accepted_at: DateTime<Utc>, deadline: Instant) -> Self {
        Self {
            campaign_id,
            accepted_at,
            deadline,
            journal: Arc::new(CommitJournal::default()),
        }
    }
}

pub struct GenerationOrchestrator {
    validator: Arc<SegmentValidator>,
    assembler: StructureAssembler,
    adapter: Arc<dyn PlatformAdapter>,
    repository: Arc<dyn CampaignRepository>,
    retry: RetryPolicy,
}

impl GenerationOrchestrator {
    pub fn new(
        validator: Arc<SegmentValidator>,
        assembler: StructureAssembler,
        adapter: Arc<dyn PlatformAdapter>,
        repository: Arc<dyn CampaignRepository>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            validator,
            assembler,
            adapter,
            repository,
            retry,
        }
    }

    /// Run one generation to a committed `COMPLETED` campaign. Does not
    /// enforce the deadline itself; retries stop short of it.
    pub async fn execute(&self, ctx: &GenerationContext, request: &GenerationRequest) -> CampaignResult<Campaign> {
        let mut campaign = Campaign::queued(ctx.campaign_id, request, ctx.accepted_at);
        campaign.transition(ProcessingStatus::Processing)?;
        info!(
            campaign_id = %campaign.id,
            platform_type = ?request.platform_type,
            rules = request.targeting.rules.len(),
            budget = request.budget,
            "Generation started"
        );

        let segments = timed("validate", async { self.validate_request(request, ctx.accepted_at) }).await?;
        let platform_settings = timed("assemble", self.assemble(ctx, request, &segments)).await?;

        campaign.optimization_hints = self.assembler.hints(&segments, &platform_settings);
        campaign.targeting_settings = TargetingSettings { segments };
        campaign.platform_settings = platform_settings;
        campaign.transition(ProcessingStatus::Completed)?;

        timed("commit", self.commit(ctx, &campaign)).await?;
        info!(
            campaign_id = %campaign.id,
            segments = campaign.targeting_settings.segments.len(),
            "Generation committed"
        );
        Ok(campaign)
    }

    /// Input checks plus one validated segment per target platform. All
    /// issues across platforms are reported together.
    fn validate_request(&self, request: &GenerationRequest, now: DateTime<Utc>) -> CampaignResult<Vec<AudienceSegment>> {
        let mut issues = Vec::new();
        if !request.budget.is_finite() || request.budget <= 0.0 {
            issues.push(ValidationIssue::new(
                ValidationCode::InvalidBudget,
                "budget",
                "budget must be a positive amount",
            ));
        }
        issues.extend(request.date_range.validate(now));

        let (segments, segment_issues) = self.build_segments(request.platform_type, &request.targeting)?;
        issues.extend(segment_issues);

        if issues.is_empty() {
            Ok(segments)
        } else {
            Err(CampaignError::Validation(issues))
        }
    }

    fn build_segments(
        &self,
        platform_type: PlatformType,
        targeting: &TargetingInput,
    ) -> CampaignResult<(Vec<AudienceSegment>, Vec<ValidationIssue>)> {
        let multi = platform_type == PlatformType::Both;
        let mut segments = Vec::new();
        let mut issues = Vec::new();
        for platform in platform_type.platforms() {
            let mut segment = SegmentBuilder::from_input(targeting, platform).build();
            let report = self.validator.validate(&segment)?;
            if report.valid {
                segment.estimated_reach = report.estimated_reach;
                segment.confidence = report.confidence;
                segments.push(segment);
            } else {
                issues.extend(report.errors.into_iter().map(|mut issue| {
                    if multi {
                        issue.field = format!("{platform}.{}", issue.field);
                    }
                    issue
                }));
            }
        }
        Ok((segments, issues))
    }

    async fn assemble(
        &self,
        ctx: &GenerationContext,
        request: &GenerationRequest,
        segments: &[AudienceSegment],
    ) -> CampaignResult<Vec<PlatformSettings>> {
        let days = request.date_range.duration_days();
        let mut issues = Vec::new();
        let mut assembled = Vec::with_capacity(segments.len());
        for (platform, budget) in self.assembler.budget_split(request.platform_type, request.budget) {
            let Some(segment) = segments.iter().find(|s| s.platform == platform) else {
                continue;
            };
            match self.assembler.assemble(segment, budget, days) {
                Ok(settings) => assembled.push(settings),
                Err(CampaignError::Validation(found)) => issues.extend(found),
                Err(e) => return Err(e),
            }
        }
        if !issues.is_empty() {
            return Err(CampaignError::Validation(issues));
        }

        for settings in &assembled {
            self.retry
                .run("platform_adapter", ctx.deadline, |_| self.adapter.validate_structure(settings))
                .await?;
        }
        Ok(assembled)
    }

    /// Segments first, then the campaign record. Each id is journaled before
    /// its write is issued.
    async fn commit(&self, ctx: &GenerationContext, campaign: &Campaign) -> CampaignResult<()> {
        self.persist_segments(ctx, &campaign.targeting_settings.segments).await?;
        ctx.journal.record_campaign();
        self.retry
            .run("persist_campaign", ctx.deadline, |_| async move {
                self.repository.create_campaign(campaign).await.map_err(CampaignError::from)
            })
            .await
    }

    /// Re-target a completed campaign. The new segments and settings are
    /// validated and written before the old segments are removed; on any
    /// failure or once `deadline` elapses the stored campaign is unchanged.
    /// The update runs in its own task so its writes are undone even if the
    /// caller stops waiting.
    pub async fn retarget(
        self: &Arc<Self>,
        campaign: Campaign,
        targeting: TargetingInput,
        deadline: Duration,
    ) -> CampaignResult<Campaign> {
        let this = Arc::clone(self);
        let task = tokio::spawn(async move {
            let ctx = GenerationContext::new(campaign.id, campaign.created_at, Instant::now() + deadline);
            let outcome = match tokio::time::timeout_at(ctx.deadline, this.apply_retarget(&ctx, &campaign, &targeting))
                .await
            {
                Ok(result) => result,
                Err(_) => {
                    warn!(campaign_id = %campaign.id, "Targeting update exceeded its deadline");
                    Err(CampaignError::GenerationTimeout {
                        deadline_ms: deadline.as_millis() as u64,
                    })
                }
            };
            match outcome {
                Ok(updated) => {
                    for old in &campaign.targeting_settings.segments {
                        if let Err(e) = this.repository.delete_segment(old.id).await {
                            warn!(segment_id = %old.id, error = %e, "Could not remove superseded segment");
                        }
                    }
                    info!(campaign_id = %updated.id, "Campaign targeting updated");
                    Ok(updated)
                }
                Err(e) => {
                    ctx.journal.rollback(this.repository.as_ref()).await;
                    Err(e)
                }
            }
        });
        task.await
            .map_err(|e| CampaignError::System(format!("targeting update aborted: {e}")))?
    }

    async fn apply_retarget(
        &self,
        ctx: &GenerationContext,
        campaign: &Campaign,
        targeting: &TargetingInput,
    ) -> CampaignResult<Campaign> {
        if campaign.processing_status != ProcessingStatus::Completed {
            return Err(CampaignError::InvalidState(format!(
                "campaign {} is {:?}; only completed campaigns can be re-targeted",
                campaign.id, campaign.processing_status
            )));
        }

        let (segments, issues) = self.build_segments(campaign.platform_type, targeting)?;
        if !issues.is_empty() {
            return Err(CampaignError::Validation(issues));
        }
        let request = GenerationRequest {
            platform_type: campaign.platform_type,
            targeting: targeting.clone(),
            budget: campaign.total_budget,
            date_range: campaign.date_range,
        };
        let platform_settings = self.assemble(ctx, &request, &segments).await?;

        let mut updated = campaign.clone();
        updated.name = targeting.name.clone();
        updated.optimization_hints = self.assembler.hints(&segments, &platform_settings);
        updated.targeting_settings = TargetingSettings { segments };
        updated.platform_settings = platform_settings;
        updated.updated_at = Utc::now();

        self.write_retarget(ctx, &updated).await?;
        Ok(updated)
    }

    async fn persist_segments(&self, ctx: &GenerationContext, segments: &[AudienceSegment]) -> CampaignResult<()> {
        for segment in segments {
            ctx.journal.record_segment(segment.id);
            self.retry
                .run("persist_segment", ctx.deadline, |_| async move {
                    self.repository.create_segment(segment).await.map_err(CampaignError::from)
                })
                .await?;
        }
        Ok(())
    }

    async fn write_retarget(&self, ctx: &GenerationContext, updated: &Campaign) -> CampaignResult<()> {
        self.persist_segments(ctx, &updated.targeting_settings.segments).await?;
        self.retry
            .run("persist_campaign", ctx.deadline, |_| async move {
                self.repository.update_campaign(updated).await.map_err(CampaignError::from)
            })
            .await
    }
}
