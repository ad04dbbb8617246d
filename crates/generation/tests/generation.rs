use async_trait::async_trait;
use campaign_core::types::{
    AudienceSegment, Campaign, Criteria, DateRange, GenerationRequest, OptimizationSettings, Platform, PlatformType,
    ProcessingStatus, TargetingInput, TargetingRule,
};
use campaign_core::{AppConfig, CampaignError, ErrorCode, ValidationCode};
use campaign_generation::CampaignService;
use campaign_store::{CampaignRepository, InMemoryStore, StoreError, StoreResult};
use chrono::Utc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// ─── Test doubles ───────────────────────────────────────────────────────────

/// In-memory store that can slow down or fail writes of completed campaigns
/// and stall campaign updates.
#[derive(Default)]
struct ScriptedStore {
    inner: InMemoryStore,
    completed_write_delay: Option<Duration>,
    update_delay: Option<Duration>,
    completed_write_failures: AtomicU32,
    always_fail_completed: bool,
}

impl ScriptedStore {
    fn slow(delay: Duration) -> Self {
        Self {
            completed_write_delay: Some(delay),
            ..Default::default()
        }
    }

    fn failing(times: u32) -> Self {
        Self {
            completed_write_failures: AtomicU32::new(times),
            ..Default::default()
        }
    }

    fn stalled_updates(delay: Duration) -> Self {
        Self {
            update_delay: Some(delay),
            ..Default::default()
        }
    }

    fn broken() -> Self {
        Self {
            always_fail_completed: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl CampaignRepository for ScriptedStore {
    async fn create_campaign(&self, campaign: &Campaign) -> StoreResult<()> {
        if campaign.processing_status == ProcessingStatus::Completed {
            if let Some(delay) = self.completed_write_delay {
                tokio::time::sleep(delay).await;
            }
            if self.always_fail_completed {
                return Err(StoreError::Unavailable("primary down".into()));
            }
            let remaining = self.completed_write_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.completed_write_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::Unavailable("connection reset".into()));
            }
        }
        self.inner.create_campaign(campaign).await
    }

    async fn read_campaign(&self, id: Uuid) -> StoreResult<Option<Campaign>> {
        self.inner.read_campaign(id).await
    }

    async fn update_campaign(&self, campaign: &Campaign) -> StoreResult<()> {
        if let Some(delay) = self.update_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.update_campaign(campaign).await
    }

    async fn delete_campaign(&self, id: Uuid) -> StoreResult<bool> {
        self.inner.delete_campaign(id).await
    }

    async fn create_segment(&self, segment: &AudienceSegment) -> StoreResult<()> {
        self.inner.create_segment(segment).await
    }

    async fn read_segment(&self, id: Uuid) -> StoreResult<Option<AudienceSegment>> {
        self.inner.read_segment(id).await
    }

    async fn update_segment(&self, segment: &AudienceSegment) -> StoreResult<()> {
        self.inner.update_segment(segment).await
    }

    async fn delete_segment(&self, id: Uuid) -> StoreResult<bool> {
        self.inner.delete_segment(id).await
    }
}

// ─── Fixtures ───────────────────────────────────────────────────────────────

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.retry.jitter_ms = 0;
    config
}

fn service(store: Arc<ScriptedStore>) -> CampaignService {
    CampaignService::with_defaults(&config(), store)
}

fn broad_interest(tag: &str, weight: f64) -> TargetingRule {
    TargetingRule::include(
        Criteria::Interest {
            categories: (0..20).map(|i| format!("{tag}-{i}")).collect(),
            keywords: vec![],
        },
        weight,
    )
}

fn targeting(rules: usize) -> TargetingInput {
    TargetingInput {
        name: "Cloud infrastructure buyers".into(),
        description: "Engineering leaders evaluating cloud platforms".into(),
        rules: (0..rules).map(|i| broad_interest(&format!("topic{i}"), 0.7)).collect(),
    }
}

fn next_month() -> DateRange {
    let start = Utc::now() + chrono::Duration::days(1);
    DateRange {
        start,
        end: start + chrono::Duration::days(30),
    }
}

fn request(platform_type: PlatformType, rules: usize) -> GenerationRequest {
    GenerationRequest {
        platform_type,
        targeting: targeting(rules),
        budget: 9_000.0,
        date_range: next_month(),
    }
}

// ─── Generation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_generates_both_platforms() {
    let store = Arc::new(ScriptedStore::default());
    let svc = service(store.clone());
    let campaign = svc
        .generate_campaign_structure(PlatformType::Both, targeting(3), 9_000.0, next_month())
        .await
        .unwrap();

    assert_eq!(campaign.processing_status, ProcessingStatus::Completed);
    assert_eq!(campaign.targeting_settings.segments.len(), 2);
    assert_eq!(campaign.platform_settings.len(), 2);
    for segment in &campaign.targeting_settings.segments {
        let constraints = svc.registry().get(segment.platform).unwrap();
        assert!(segment.estimated_reach >= constraints.min_reach);
        assert!(segment.estimated_reach <= constraints.max_reach);
        assert!((segment.confidence - 0.7).abs() < 1e-12);
    }
    let total: f64 = campaign.platform_settings.iter().map(|s| s.total_budget).sum();
    assert!((total - 9_000.0).abs() < 1e-9);

    let stored = svc.get_campaign(campaign.id).await.unwrap();
    assert_eq!(stored.processing_status, ProcessingStatus::Completed);
    assert_eq!(store.inner.segment_count(), 2);
}

#[tokio::test]
async fn test_rule_limit_reported_per_platform() {
    let store = Arc::new(ScriptedStore::default());
    let err = service(store.clone())
        .generate_campaign_structure(PlatformType::Both, targeting(6), 9_000.0, next_month())
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ValidationError);
    assert!(err.has_issue(ValidationCode::ExceededRuleLimit));
    assert!(err.issues().iter().all(|i| i.field.starts_with("google.")));
    // Nothing from the run survives except its failure record.
    assert_eq!(store.inner.segment_count(), 0);
    assert_eq!(store.inner.count_by_status(ProcessingStatus::Failed), 1);
    let failed = &store.inner.list_campaigns()[0];
    assert_eq!(failed.failure.as_ref().map(|f| f.code), Some(ErrorCode::ValidationError));
}

#[tokio::test]
async fn test_budget_and_dates_validated_together() {
    let store = Arc::new(ScriptedStore::default());
    let past = Utc::now() - chrono::Duration::days(2);
    let err = service(store)
        .generate_campaign_structure(
            PlatformType::Linkedin,
            targeting(1),
            0.0,
            DateRange {
                start: past,
                end: past + chrono::Duration::days(1),
            },
        )
        .await
        .unwrap_err();
    assert!(err.has_issue(ValidationCode::InvalidBudget));
    assert!(err.has_issue(ValidationCode::InvalidDateRange));
}

#[tokio::test]
async fn test_daily_budget_below_platform_minimum() {
    let store = Arc::new(ScriptedStore::default());
    let err = service(store.clone())
        .generate_campaign_structure(PlatformType::Linkedin, targeting(2), 100.0, next_month())
        .await
        .unwrap_err();
    assert!(err.has_issue(ValidationCode::InvalidBudget));
    assert_eq!(store.inner.segment_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_exceeded_rolls_back_and_records_failure() {
    let store = Arc::new(ScriptedStore::slow(Duration::from_secs(40)));
    let svc = service(store.clone());
    let handle = svc.start_generation(request(PlatformType::Linkedin, 2));
    let campaign_id = handle.campaign_id();
    let progress = handle.subscribe();

    let err = handle.wait().await.unwrap_err();
    assert!(matches!(err, CampaignError::GenerationTimeout { deadline_ms: 30_000 }));
    assert_eq!(err.code(), ErrorCode::GenerationTimeout);

    let last = progress.borrow().clone();
    assert_eq!(last.status, ProcessingStatus::Failed);
    assert_eq!(last.error, Some(ErrorCode::GenerationTimeout));
    assert!(last.percent < 100);

    let stored = svc.get_campaign(campaign_id).await.unwrap();
    assert_eq!(stored.processing_status, ProcessingStatus::Failed);
    assert_eq!(
        stored.failure.map(|f| f.code),
        Some(ErrorCode::GenerationTimeout)
    );
    assert_eq!(store.inner.segment_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_caller_still_settles_the_campaign() {
    let store = Arc::new(ScriptedStore::slow(Duration::from_secs(40)));
    let svc = service(store.clone());

    let abandoned = tokio::time::timeout(
        Duration::from_secs(2),
        svc.generate_campaign_structure(PlatformType::Linkedin, targeting(2), 9_000.0, next_month()),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(store.inner.segment_count(), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(store.inner.segment_count(), 0);
    assert_eq!(store.inner.count_by_status(ProcessingStatus::Failed), 1);
    let failed = &store.inner.list_campaigns()[0];
    assert_eq!(failed.failure.as_ref().map(|f| f.code), Some(ErrorCode::GenerationTimeout));
}

#[tokio::test(start_paused = true)]
async fn test_progress_reaches_completion_only_after_commit() {
    let store = Arc::new(ScriptedStore::slow(Duration::from_secs(10)));
    let svc = service(store.clone());
    let handle = svc.start_generation(request(PlatformType::Linkedin, 2));

    tokio::time::sleep(Duration::from_millis(5_500)).await;
    let midway = handle.progress();
    assert_eq!(midway.status, ProcessingStatus::Processing);
    assert!((1..100).contains(&midway.percent), "{midway:?}");
    assert_eq!(store.inner.campaign_count(), 0);

    let progress = handle.subscribe();
    let campaign = handle.wait().await.unwrap();
    let last = progress.borrow().clone();
    assert_eq!(last.status, ProcessingStatus::Completed);
    assert_eq!(last.percent, 100);
    assert_eq!(
        svc.get_campaign(campaign.id).await.unwrap().processing_status,
        ProcessingStatus::Completed
    );
}

#[tokio::test(start_paused = true)]
async fn test_transient_persistence_failures_are_retried() {
    let store = Arc::new(ScriptedStore::failing(2));
    let campaign = service(store.clone())
        .generate_campaign_structure(PlatformType::Linkedin, targeting(2), 9_000.0, next_month())
        .await
        .unwrap();
    assert_eq!(campaign.processing_status, ProcessingStatus::Completed);
    assert_eq!(store.inner.count_by_status(ProcessingStatus::Completed), 1);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_failure_rolls_back_segments() {
    let store = Arc::new(ScriptedStore::broken());
    let err = service(store.clone())
        .generate_campaign_structure(PlatformType::Both, targeting(2), 9_000.0, next_month())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::SystemError);
    assert_eq!(store.inner.segment_count(), 0);
    assert_eq!(store.inner.count_by_status(ProcessingStatus::Failed), 1);
    assert_eq!(store.inner.count_by_status(ProcessingStatus::Completed), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_generations_are_isolated() {
    let store = Arc::new(ScriptedStore::default());
    let svc = Arc::new(service(store.clone()));
    let handles: Vec<_> = (0..20)
        .map(|_| svc.start_generation(request(PlatformType::Linkedin, 2)))
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let campaign = handle.wait().await.unwrap();
        assert_eq!(campaign.targeting_settings.segments.len(), 1);
        ids.push(campaign.id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);
    assert_eq!(store.inner.count_by_status(ProcessingStatus::Completed), 20);
    assert_eq!(store.inner.segment_count(), 20);
}

// ─── Targeting updates ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_update_targeting_replaces_segments() {
    let store = Arc::new(ScriptedStore::default());
    let svc = service(store.clone());
    let campaign = svc
        .generate_campaign_structure(PlatformType::Linkedin, targeting(2), 9_000.0, next_month())
        .await
        .unwrap();
    let old_segment = campaign.targeting_settings.segments[0].id;

    let input = TargetingInput {
        name: "North American cloud buyers".into(),
        description: String::new(),
        rules: vec![
            broad_interest("cloud", 0.8),
            TargetingRule::include(
                Criteria::Location {
                    countries: vec!["US".into(), "CA".into()],
                    regions: vec![],
                    radius: None,
                },
                0.6,
            ),
        ],
    };
    let updated = svc.update_targeting(campaign.id, input).await.unwrap();

    assert_eq!(updated.id, campaign.id);
    assert_eq!(updated.name, "North American cloud buyers");
    assert_ne!(updated.targeting_settings.segments[0].id, old_segment);
    assert!(svc.get_segment(old_segment).await.is_err());
    assert_eq!(store.inner.segment_count(), 1);
    assert_eq!(svc.get_campaign(campaign.id).await.unwrap().name, updated.name);
}

#[tokio::test]
async fn test_invalid_targeting_update_leaves_campaign_unchanged() {
    let store = Arc::new(ScriptedStore::default());
    let svc = service(store.clone());
    let campaign = svc
        .generate_campaign_structure(PlatformType::Linkedin, targeting(2), 9_000.0, next_month())
        .await
        .unwrap();

    let err = svc.update_targeting(campaign.id, targeting(9)).await.unwrap_err();
    assert!(err.has_issue(ValidationCode::ExceededRuleLimit));
    let stored = svc.get_campaign(campaign.id).await.unwrap();
    assert_eq!(stored.targeting_settings, campaign.targeting_settings);
    assert_eq!(store.inner.segment_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_targeting_update_times_out_and_rolls_back() {
    let store = Arc::new(ScriptedStore::stalled_updates(Duration::from_secs(120)));
    let svc = service(store.clone());
    let campaign = svc
        .generate_campaign_structure(PlatformType::Linkedin, targeting(2), 9_000.0, next_month())
        .await
        .unwrap();

    let started = tokio::time::Instant::now();
    let err = svc.update_targeting(campaign.id, targeting(1)).await.unwrap_err();
    assert!(started.elapsed() <= Duration::from_secs(31), "{:?}", started.elapsed());
    assert!(matches!(err, CampaignError::GenerationTimeout { deadline_ms: 30_000 }));

    let stored = svc.get_campaign(campaign.id).await.unwrap();
    assert_eq!(stored.targeting_settings, campaign.targeting_settings);
    assert_eq!(store.inner.segment_count(), 1);
    let kept = campaign.targeting_settings.segments[0].id;
    assert!(svc.get_segment(kept).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_targeting_update_is_rolled_back() {
    let store = Arc::new(ScriptedStore::stalled_updates(Duration::from_secs(120)));
    let svc = service(store.clone());
    let campaign = svc
        .generate_campaign_structure(PlatformType::Linkedin, targeting(2), 9_000.0, next_month())
        .await
        .unwrap();

    let abandoned = tokio::time::timeout(Duration::from_secs(1), svc.update_targeting(campaign.id, targeting(1))).await;
    assert!(abandoned.is_err());
    assert_eq!(store.inner.segment_count(), 2);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(store.inner.segment_count(), 1);
    let stored = svc.get_campaign(campaign.id).await.unwrap();
    assert_eq!(stored.targeting_settings, campaign.targeting_settings);
}

#[tokio::test]
async fn test_failed_campaign_cannot_be_retargeted() {
    let store = Arc::new(ScriptedStore::default());
    let svc = service(store.clone());
    svc.generate_campaign_structure(PlatformType::Google, targeting(6), 9_000.0, next_month())
        .await
        .unwrap_err();
    let failed = store.inner.list_campaigns()[0].id;

    let err = svc.update_targeting(failed, targeting(2)).await.unwrap_err();
    assert!(matches!(err, CampaignError::InvalidState(_)));
}

// ─── Segments ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_invalid_optimization_settings_leave_segment_untouched() {
    let store = Arc::new(ScriptedStore::default());
    let svc = service(store.clone());
    let segment = svc.create_segment(targeting(1), Platform::Linkedin).await.unwrap();

    let err = svc
        .optimize_segment(
            segment.id,
            OptimizationSettings {
                min_confidence: 1.5,
                budget_constraint: 500.0,
                max_suggestions: None,
            },
        )
        .await
        .unwrap_err();
    assert!(err.has_issue(ValidationCode::InvalidOptimizationSettings));
    assert_eq!(svc.get_segment(segment.id).await.unwrap(), segment);
}

#[tokio::test]
async fn test_optimize_segment_persists_result() {
    let store = Arc::new(ScriptedStore::default());
    let svc = service(store.clone());
    let input = TargetingInput {
        name: "Developers".into(),
        description: String::new(),
        rules: vec![broad_interest("dev", 0.3)],
    };
    let segment = svc.create_segment(input, Platform::Linkedin).await.unwrap();

    let optimized = svc
        .optimize_segment(
            segment.id,
            OptimizationSettings {
                min_confidence: 0.5,
                budget_constraint: 500.0,
                max_suggestions: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(optimized.id, segment.id);
    assert_eq!(optimized.targeting_rules.len(), 3);
    assert_eq!(optimized.targeting_rules[0].weight, 0.5);
    let metadata = optimized.metadata.clone().unwrap();
    assert_eq!(metadata.recommended_budget, Some(500.0));

    assert_eq!(svc.get_segment(segment.id).await.unwrap(), optimized);
}

#[tokio::test]
async fn test_sync_to_google_reports_rule_limit() {
    let store = Arc::new(ScriptedStore::default());
    let svc = service(store.clone());
    let segment = svc.create_segment(targeting(6), Platform::Linkedin).await.unwrap();

    let err = svc.sync_segment(segment.id, Platform::Google).await.unwrap_err();
    assert!(err.has_issue(ValidationCode::ExceededRuleLimit));
    assert_eq!(store.inner.segment_count(), 1);
    assert_eq!(svc.get_segment(segment.id).await.unwrap(), segment);
}

#[tokio::test]
async fn test_sync_creates_linked_segment() {
    let store = Arc::new(ScriptedStore::default());
    let svc = service(store.clone());
    let segment = svc.create_segment(targeting(2), Platform::Linkedin).await.unwrap();

    let synced = svc.sync_segment(segment.id, Platform::Google).await.unwrap();
    assert_eq!(synced.platform, Platform::Google);
    assert_eq!(
        synced.metadata.as_ref().and_then(|m| m.source_segment_id),
        Some(segment.id)
    );
    assert_eq!(store.inner.segment_count(), 2);
    assert_eq!(svc.get_segment(segment.id).await.unwrap(), segment);
}

#[tokio::test]
async fn test_unknown_segment_is_not_found() {
    let svc = service(Arc::new(ScriptedStore::default()));
    let err = svc.get_segment(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[test]
fn test_validate_rules_per_platform() {
    let svc = service(Arc::new(ScriptedStore::default()));
    let rules = targeting(6).rules;
    assert!(svc.validate_rules(&rules, Platform::Linkedin).unwrap().valid);
    let google = svc.validate_rules(&rules, Platform::Google).unwrap();
    assert!(!google.valid);
    assert!(google.errors.iter().any(|e| e.code == ValidationCode::ExceededRuleLimit));
}
