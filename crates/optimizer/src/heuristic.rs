//! Deterministic rule-based suggestion provider, used when no external
//! model endpoint is configured and in development.

use crate::advisor::SuggestionProvider;
use async_trait::async_trait;
use campaign_core::types::{
    AudienceSegment, Criteria, OptimizationSettings, RuleSuggestion, RuleType, Seniority, TargetingRule,
};
use campaign_targeting::ConstraintRegistry;
use std::sync::Arc;
use tracing::debug;

/// Weight an under-weighted rule is raised to.
const WEIGHT_FLOOR: f64 = 0.5;

pub struct HeuristicSuggestionProvider {
    registry: Arc<ConstraintRegistry>,
}

impl HeuristicSuggestionProvider {
    pub fn new(registry: Arc<ConstraintRegistry>) -> Self {
        Self { registry }
    }

    fn additions() -> Vec<(RuleType, Criteria, f64, f64, &'static str)> {
        vec![
            (
                RuleType::Interest,
                Criteria::Interest {
                    categories: vec!["Business Software".into(), "Enterprise Technology".into()],
                    keywords: vec![],
                },
                0.6,
                0.7,
                "segment has no interest signal",
            ),
            (
                RuleType::Location,
                Criteria::Location {
                    countries: vec!["US".into(), "CA".into(), "GB".into(), "DE".into()],
                    regions: vec![],
                    radius: None,
                },
                0.5,
                0.65,
                "segment is not geographically scoped",
            ),
            (
                RuleType::JobTitle,
                Criteria::JobTitle {
                    titles: vec!["Marketing Manager".into(), "Head of Marketing".into()],
                    seniority: vec![Seniority::Manager, Seniority::Director],
                },
                0.6,
                0.55,
                "segment does not target decision makers",
            ),
        ]
    }
}

#[async_trait]
impl SuggestionProvider for HeuristicSuggestionProvider {
    async fn suggest(
        &self,
        segment: &AudienceSegment,
        _settings: &OptimizationSettings,
    ) -> anyhow::Result<Vec<RuleSuggestion>> {
        let constraints = self.registry.get(segment.platform)?;
        let mut out = Vec::new();

        for rule in segment.active_rules().filter(|r| r.weight < WEIGHT_FLOOR) {
            let mut raised = rule.clone();
            raised.weight = WEIGHT_FLOOR;
            out.push(RuleSuggestion {
                rule: raised,
                confidence: 0.55,
                rationale: format!("{} rule is under-weighted", rule.rule_type),
            });
        }

        let mut room = constraints
            .max_rules
            .saturating_sub(segment.targeting_rules.len());
        for (rule_type, criteria, weight, confidence, rationale) in Self::additions() {
            if room == 0 {
                break;
            }
            let present = segment.targeting_rules.iter().any(|r| r.rule_type == rule_type);
            if present || !constraints.supports(rule_type) {
                continue;
            }
            out.push(RuleSuggestion {
                rule: TargetingRule::include(criteria, weight),
                confidence,
                rationale: rationale.to_string(),
            });
            room -= 1;
        }

        debug!(segment_id = %segment.id, count = out.len(), "Heuristic suggestions produced");
        Ok(out)
    }
}
