//! External operations of the campaign generator, wired over the shared
//! constraint registry, validator, advisor and repository.

use crate::orchestrator::GenerationOrchestrator;
use crate::retry::RetryPolicy;
use crate::structure::{LocalPlatformAdapter, PlatformAdapter, StructureAssembler};
use crate::supervisor::{GenerationHandle, GenerationSupervisor};
use campaign_core::types::{
    AudienceSegment, Campaign, DateRange, GenerationRequest, OptimizationSettings, Platform, PlatformType,
    TargetingInput, TargetingRule,
};
use campaign_core::{AppConfig, CampaignError, CampaignResult};
use campaign_optimizer::{HeuristicSuggestionProvider, OptimizationAdvisor, SuggestionProvider};
use campaign_store::CampaignRepository;
use campaign_targeting::{
    ConstraintRegistry, RuleValidation, RuleValidator, SegmentBuilder, SegmentValidator, ValidationCache,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

pub struct CampaignService {
    registry: Arc<ConstraintRegistry>,
    validator: Arc<SegmentValidator>,
    validation_cache: Arc<ValidationCache>,
    advisor: OptimizationAdvisor,
    orchestrator: Arc<GenerationOrchestrator>,
    supervisor: Arc<GenerationSupervisor>,
    repository: Arc<dyn CampaignRepository>,
    retry: RetryPolicy,
}

impl CampaignService {
    pub fn new(
        config: &AppConfig,
        registry: Arc<ConstraintRegistry>,
        repository: Arc<dyn CampaignRepository>,
        provider: Arc<dyn SuggestionProvider>,
        adapter: Arc<dyn PlatformAdapter>,
    ) -> Self {
        let cache = Arc::new(ValidationCache::new(
            "segment_validation",
            Duration::from_secs(config.cache.ttl_secs),
            config.cache.max_entries,
        ));
        let validator = Arc::new(SegmentValidator::new(registry.clone()).with_cache(cache.clone()));
        let retry = RetryPolicy::from_config(&config.retry);
        let orchestrator = Arc::new(GenerationOrchestrator::new(
            validator.clone(),
            StructureAssembler::new(registry.clone(), config.generation.linkedin_budget_share),
            adapter,
            repository.clone(),
            retry.clone(),
        ));
        let supervisor = Arc::new(GenerationSupervisor::new(
            orchestrator.clone(),
            repository.clone(),
            &config.generation,
        ));
        let advisor = OptimizationAdvisor::new(provider, validator.clone(), &config.advisor);

        info!(
            platforms = ?registry.platforms(),
            deadline_ms = config.generation.deadline_ms,
            "Campaign service ready"
        );
        Self {
            registry,
            validator,
            validation_cache: cache,
            advisor,
            orchestrator,
            supervisor,
            repository,
            retry,
        }
    }

    /// Built-in constraints, heuristic suggestions and the offline adapter.
    pub fn with_defaults(config: &AppConfig, repository: Arc<dyn CampaignRepository>) -> Self {
        let registry = Arc::new(ConstraintRegistry::new());
        let provider = Arc::new(HeuristicSuggestionProvider::new(registry.clone()));
        Self::new(config, registry, repository, provider, Arc::new(LocalPlatformAdapter))
    }

    pub fn registry(&self) -> &ConstraintRegistry {
        &self.registry
    }

    /// Drop expired validation reports. Returns how many were removed.
    pub fn maintenance(&self) -> usize {
        self.validation_cache.evict_expired()
    }

    // ─── Generation ─────────────────────────────────────────────────────────

    pub async fn generate_campaign_structure(
        &self,
        platform_type: PlatformType,
        targeting: TargetingInput,
        budget: f64,
        date_range: DateRange,
    ) -> CampaignResult<Campaign> {
        self.supervisor
            .generate(GenerationRequest {
                platform_type,
                targeting,
                budget,
                date_range,
            })
            .await
    }

    /// Accept a generation and return immediately with a progress handle.
    pub fn start_generation(&self, request: GenerationRequest) -> GenerationHandle {
        self.supervisor.spawn(request)
    }

    pub async fn get_campaign(&self, id: Uuid) -> CampaignResult<Campaign> {
        self.repository
            .read_campaign(id)
            .await?
            .ok_or_else(|| CampaignError::NotFound(format!("campaign {id}")))
    }

    /// Replace the targeting of a completed campaign.
    pub async fn update_targeting(&self, campaign_id: Uuid, targeting: TargetingInput) -> CampaignResult<Campaign> {
        let campaign = self.get_campaign(campaign_id).await?;
        self.orchestrator
            .retarget(campaign, targeting, self.supervisor.deadline())
            .await
    }

    // ─── Targeting ──────────────────────────────────────────────────────────

    pub fn validate_rules(&self, rules: &[TargetingRule], platform: Platform) -> CampaignResult<RuleValidation> {
        let constraints = self.registry.get(platform)?;
        Ok(RuleValidator::validate_all(rules, constraints))
    }

    pub async fn create_segment(&self, input: TargetingInput, platform: Platform) -> CampaignResult<AudienceSegment> {
        let segment = self
            .validator
            .validated(&SegmentBuilder::from_input(&input, platform).build())?;
        self.persist_segment(&segment).await?;
        info!(segment_id = %segment.id, platform = %platform, "Segment created");
        Ok(segment)
    }

    pub async fn get_segment(&self, id: Uuid) -> CampaignResult<AudienceSegment> {
        self.repository
            .read_segment(id)
            .await?
            .ok_or_else(|| CampaignError::NotFound(format!("segment {id}")))
    }

    /// Apply ranked suggestions; the stored segment changes only when the
    /// optimized segment validates and is written.
    pub async fn optimize_segment(&self, id: Uuid, settings: OptimizationSettings) -> CampaignResult<AudienceSegment> {
        settings.validate()?;
        let segment = self.get_segment(id).await?;
        let optimized = self.advisor.optimize(&segment, &settings).await?;
        let deadline = Instant::now() + self.supervisor.deadline();
        let stored = &optimized;
        self.retry
            .run("persist_segment", deadline, |_| async move {
                self.repository.update_segment(stored).await.map_err(CampaignError::from)
            })
            .await?;
        Ok(optimized)
    }

    /// Copy a segment onto another platform as a new segment. The source
    /// segment is never modified.
    pub async fn sync_segment(&self, id: Uuid, target: Platform) -> CampaignResult<AudienceSegment> {
        let segment = self.get_segment(id).await?;
        let synced = self.validator.sync_to_platform(&segment, target)?;
        self.persist_segment(&synced).await?;
        info!(source_id = %id, segment_id = %synced.id, platform = %target, "Segment synced");
        Ok(synced)
    }

    async fn persist_segment(&self, segment: &AudienceSegment) -> CampaignResult<()> {
        let deadline = Instant::now() + self.supervisor.deadline();
        self.retry
            .run("persist_segment", deadline, |_| async move {
                self.repository.create_segment(segment).await.map_err(CampaignError::from)
            })
            .await
    }
}
