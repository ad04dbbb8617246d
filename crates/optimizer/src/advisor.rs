//! Optimization advisor over the AI suggestion collaborator.

use async_trait::async_trait;
use campaign_core::config::AdvisorConfig;
use campaign_core::types::{AudienceSegment, OptimizationSettings, RuleSuggestion, SegmentMetadata};
use campaign_core::{CampaignError, CampaignResult};
use campaign_targeting::SegmentValidator;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Spend recommended per reachable member when deriving a budget hint.
const SPEND_PER_REACH: f64 = 0.02;

/// External source of ranked rule suggestions. Implementations may be slow
/// or unavailable; the advisor bounds every call.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    async fn suggest(
        &self,
        segment: &AudienceSegment,
        settings: &OptimizationSettings,
    ) -> anyhow::Result<Vec<RuleSuggestion>>;
}

pub struct OptimizationAdvisor {
    provider: Arc<dyn SuggestionProvider>,
    validator: Arc<SegmentValidator>,
    timeout: Duration,
    max_suggestions: usize,
}

impl OptimizationAdvisor {
    pub fn new(provider: Arc<dyn SuggestionProvider>, validator: Arc<SegmentValidator>, config: &AdvisorConfig) -> Self {
        Self {
            provider,
            validator,
            timeout: Duration::from_millis(config.timeout_ms),
            max_suggestions: config.max_suggestions,
        }
    }

    /// Suggestions at or above `settings.min_confidence`, highest first.
    /// Settings are checked before the collaborator is contacted.
    pub async fn suggest(
        &self,
        segment: &AudienceSegment,
        settings: &OptimizationSettings,
    ) -> CampaignResult<Vec<RuleSuggestion>> {
        settings.validate()?;

        let raw = tokio::time::timeout(self.timeout, self.provider.suggest(segment, settings))
            .await
            .map_err(|_| {
                warn!(segment_id = %segment.id, timeout_ms = self.timeout.as_millis() as u64, "Suggestion provider timed out");
                metrics::counter!("advisor.timeouts").increment(1);
                CampaignError::System(format!(
                    "suggestion provider timed out after {} ms",
                    self.timeout.as_millis()
                ))
            })?
            .map_err(|e| CampaignError::System(format!("suggestion provider failed: {e}")))?;

        let received = raw.len();
        let mut ranked: Vec<RuleSuggestion> = raw
            .into_iter()
            .filter(|s| (0.0..=1.0).contains(&s.confidence) && s.confidence >= settings.min_confidence)
            .collect();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        ranked.truncate(settings.max_suggestions.unwrap_or(self.max_suggestions));

        metrics::counter!("advisor.suggestions").increment(ranked.len() as u64);
        info!(
            segment_id = %segment.id,
            received,
            kept = ranked.len(),
            min_confidence = settings.min_confidence,
            "Suggestions ranked"
        );
        Ok(ranked)
    }

    /// Apply the kept suggestions and re-validate. A suggestion whose rule id
    /// matches an existing rule replaces it; any other is appended. On any
    /// failure the caller's segment is left as it was.
    pub async fn optimize(
        &self,
        segment: &AudienceSegment,
        settings: &OptimizationSettings,
    ) -> CampaignResult<AudienceSegment> {
        let suggestions = self.suggest(segment, settings).await?;

        let mut candidate = segment.clone();
        for suggestion in &suggestions {
            match candidate
                .targeting_rules
                .iter_mut()
                .find(|r| r.id == suggestion.rule.id)
            {
                Some(existing) => *existing = suggestion.rule.clone(),
                None => candidate.targeting_rules.push(suggestion.rule.clone()),
            }
        }

        let mut optimized = self.validator.validated(&candidate).map_err(|e| {
            warn!(segment_id = %segment.id, error = %e, "Optimized segment failed re-validation");
            metrics::counter!("advisor.revalidation_failures").increment(1);
            e
        })?;

        let metadata = optimized.metadata.get_or_insert_with(SegmentMetadata::default);
        metadata.last_optimized = Some(Utc::now());
        if !suggestions.is_empty() {
            let mean = suggestions.iter().map(|s| s.confidence).sum::<f64>() / suggestions.len() as f64;
            metadata.performance_score = Some(mean);
        }
        metadata.recommended_budget =
            Some((optimized.estimated_reach as f64 * SPEND_PER_REACH).min(settings.budget_constraint));

        info!(
            segment_id = %optimized.id,
            applied = suggestions.len(),
            estimated_reach = optimized.estimated_reach,
            confidence = optimized.confidence,
            "Segment optimized"
        );
        Ok(optimized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::types::{Criteria, Platform, TargetingRule};
    use campaign_core::ValidationCode;
    use campaign_targeting::{ConstraintRegistry, SegmentBuilder};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProvider {
        suggestions: Vec<RuleSuggestion>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl FixedProvider {
        fn new(suggestions: Vec<RuleSuggestion>) -> Self {
            Self {
                suggestions,
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }
    }

    #[async_trait]
    impl SuggestionProvider for FixedProvider {
        async fn suggest(
            &self,
            _segment: &AudienceSegment,
            _settings: &OptimizationSettings,
        ) -> anyhow::Result<Vec<RuleSuggestion>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.suggestions.clone())
        }
    }

    fn interest_rule(name: &str, weight: f64) -> TargetingRule {
        TargetingRule::include(
            Criteria::Interest {
                categories: (0..20).map(|i| format!("{name}-{i}")).collect(),
                keywords: vec![],
            },
            weight,
        )
    }

    fn suggestion(rule: TargetingRule, confidence: f64) -> RuleSuggestion {
        RuleSuggestion {
            rule,
            confidence,
            rationale: String::new(),
        }
    }

    fn segment() -> AudienceSegment {
        SegmentBuilder::new("Data platform buyers", Platform::Linkedin)
            .rule(interest_rule("data", 0.4))
            .build()
    }

    fn settings(min_confidence: f64) -> OptimizationSettings {
        OptimizationSettings {
            min_confidence,
            budget_constraint: 10_000.0,
            max_suggestions: None,
        }
    }

    fn advisor(provider: Arc<FixedProvider>) -> OptimizationAdvisor {
        let validator = Arc::new(SegmentValidator::new(Arc::new(ConstraintRegistry::new())));
        OptimizationAdvisor::new(provider, validator, &AdvisorConfig::default())
    }

    #[tokio::test]
    async fn test_invalid_settings_skip_collaborator() {
        let provider = Arc::new(FixedProvider::new(vec![]));
        let advisor = advisor(provider.clone());
        let err = advisor.optimize(&segment(), &settings(1.5)).await.unwrap_err();
        assert!(err.has_issue(ValidationCode::InvalidOptimizationSettings));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_suggestions_filtered_and_ranked() {
        let provider = Arc::new(FixedProvider::new(vec![
            suggestion(interest_rule("a", 0.5), 0.6),
            suggestion(interest_rule("b", 0.5), 0.2),
            suggestion(interest_rule("c", 0.5), 0.9),
            suggestion(interest_rule("d", 0.5), 1.7),
        ]));
        let ranked = advisor(provider).suggest(&segment(), &settings(0.5)).await.unwrap();
        let confidences: Vec<f64> = ranked.iter().map(|s| s.confidence).collect();
        assert_eq!(confidences, vec![0.9, 0.6]);
    }

    #[tokio::test]
    async fn test_optimize_replaces_and_appends() {
        let original = segment();
        let mut replacement = original.targeting_rules[0].clone();
        replacement.weight = 0.9;
        let provider = Arc::new(FixedProvider::new(vec![
            suggestion(replacement.clone(), 0.8),
            suggestion(interest_rule("ml", 0.6), 0.7),
        ]));
        let optimized = advisor(provider).optimize(&original, &settings(0.5)).await.unwrap();

        assert_eq!(optimized.id, original.id);
        assert_eq!(optimized.targeting_rules.len(), 2);
        assert_eq!(optimized.targeting_rules[0], replacement);
        let metadata = optimized.metadata.unwrap();
        assert!(metadata.last_optimized.is_some());
        assert!((metadata.performance_score.unwrap() - 0.75).abs() < 1e-12);
        assert_eq!(metadata.recommended_budget, Some(10_000.0));
    }

    #[tokio::test]
    async fn test_optimize_fails_atomically_on_revalidation() {
        let unsupported = TargetingRule::include(
            Criteria::Behavior {
                behaviors: vec!["downloaded whitepaper".into()],
                match_type: campaign_core::types::MatchType::Broad,
            },
            0.5,
        );
        let provider = Arc::new(FixedProvider::new(vec![suggestion(unsupported, 0.95)]));
        let original = segment();
        let before = original.clone();
        let err = advisor(provider).optimize(&original, &settings(0.5)).await.unwrap_err();
        assert!(err.has_issue(ValidationCode::UnsupportedRuleType));
        assert_eq!(original, before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_collaborator_is_a_system_error() {
        let mut provider = FixedProvider::new(vec![]);
        provider.delay = Some(Duration::from_secs(60));
        let err = advisor(Arc::new(provider))
            .suggest(&segment(), &settings(0.5))
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignError::System(_)));
        assert!(err.is_retryable());
    }
}
