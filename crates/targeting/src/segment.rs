//! Segment-level validation: rule limits, per-rule checks, naming limits and
//! reach bounds, plus re-validation when syncing a segment to another platform.

use crate::fingerprint::segment_fingerprint;
use crate::reach;
use crate::registry::{ConstraintRegistry, PlatformConstraints};
use crate::rules::RuleValidator;
use campaign_cache::LocalCache;
use campaign_core::types::{AudienceSegment, Platform, SegmentMetadata};
use campaign_core::{CampaignError, CampaignResult, ValidationCode, ValidationIssue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Validation result with the derived reach/confidence pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    /// Clamped to the platform's `[min_reach, max_reach]`.
    pub estimated_reach: u64,
    pub confidence: f64,
}

impl SegmentReport {
    pub fn into_result(self) -> CampaignResult<SegmentReport> {
        if self.valid {
            Ok(self)
        } else {
            Err(CampaignError::Validation(self.errors))
        }
    }
}

pub type ValidationCache = LocalCache<String, SegmentReport>;

pub struct SegmentValidator {
    registry: Arc<ConstraintRegistry>,
    cache: Option<Arc<ValidationCache>>,
}

impl SegmentValidator {
    pub fn new(registry: Arc<ConstraintRegistry>) -> Self {
        Self {
            registry,
            cache: None,
        }
    }

    /// Memoize reports by segment fingerprint.
    pub fn with_cache(mut self, cache: Arc<ValidationCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn registry(&self) -> &ConstraintRegistry {
        &self.registry
    }

    /// Validate against the segment's own platform. Fails only when the
    /// platform has no registered constraints; invalid input yields a report.
    pub fn validate(&self, segment: &AudienceSegment) -> CampaignResult<SegmentReport> {
        let constraints = self.registry.get(segment.platform)?;
        let Some(cache) = &self.cache else {
            return Ok(Self::validate_against(segment, constraints));
        };
        let key = segment_fingerprint(segment);
        Ok(cache.get_or_insert_with(key, || Self::validate_against(segment, constraints)))
    }

    pub fn validate_against(segment: &AudienceSegment, constraints: &PlatformConstraints) -> SegmentReport {
        let rules = RuleValidator::validate_all(&segment.targeting_rules, constraints);
        let mut errors = rules.errors;

        let name_len = segment.name.chars().count();
        if segment.name.trim().is_empty() {
            errors.push(ValidationIssue::new(
                ValidationCode::InvalidFormat,
                "name",
                "segment name must not be empty",
            ));
        } else if name_len > constraints.max_name_length {
            errors.push(ValidationIssue::new(
                ValidationCode::InvalidFormat,
                "name",
                format!(
                    "name length {name_len} exceeds {} limit of {}",
                    constraints.platform, constraints.max_name_length
                ),
            ));
        }
        let description_len = segment.description.chars().count();
        if description_len > constraints.max_description_length {
            errors.push(ValidationIssue::new(
                ValidationCode::InvalidFormat,
                "description",
                format!(
                    "description length {description_len} exceeds {} limit of {}",
                    constraints.platform, constraints.max_description_length
                ),
            ));
        }

        let unclamped = reach::estimate_reach(&segment.targeting_rules, constraints);
        if unclamped < constraints.min_reach {
            errors.push(ValidationIssue::new(
                ValidationCode::InvalidAudienceSize,
                "estimated_reach",
                format!(
                    "estimated reach {unclamped} is below the {} minimum of {}",
                    constraints.platform, constraints.min_reach
                ),
            ));
        }
        let estimated_reach = unclamped.clamp(constraints.min_reach, constraints.max_reach);
        let confidence = reach::confidence(&segment.targeting_rules);

        debug!(
            segment_id = %segment.id,
            platform = %constraints.platform,
            errors = errors.len(),
            estimated_reach,
            "Segment validated"
        );

        SegmentReport {
            valid: errors.is_empty(),
            errors,
            estimated_reach,
            confidence,
        }
    }

    /// Validate and return a copy carrying the derived reach and confidence,
    /// or the full issue list.
    pub fn validated(&self, segment: &AudienceSegment) -> CampaignResult<AudienceSegment> {
        let report = self.validate(segment)?.into_result()?;
        let mut out = segment.clone();
        out.estimated_reach = report.estimated_reach;
        out.confidence = report.confidence;
        Ok(out)
    }

    /// Re-validate the same rule set against `target`'s constraints. Rules
    /// that do not fit are reported, never dropped. The result is a new
    /// segment; `segment` itself is untouched.
    pub fn sync_to_platform(&self, segment: &AudienceSegment, target: Platform) -> CampaignResult<AudienceSegment> {
        let mut candidate = segment.clone();
        candidate.id = Uuid::new_v4();
        candidate.platform = target;
        let metadata = candidate.metadata.get_or_insert_with(SegmentMetadata::default);
        metadata.source_segment_id = Some(segment.id);
        self.validated(&candidate)
    }
}
