//! Platform campaign structure: budget split, per-platform settings and
//! optimization hints, plus the adapter seam used to check a structure
//! against the ad platform before it is committed.

use async_trait::async_trait;
use campaign_core::types::{
    AdFormat, AudienceSegment, BidStrategy, BudgetHint, CampaignType, OptimizationHints, Platform, PlatformSettings,
    PlatformType, RuleType,
};
use campaign_core::{CampaignError, CampaignResult, ValidationCode, ValidationIssue};
use campaign_targeting::ConstraintRegistry;
use std::sync::Arc;
use tracing::debug;

/// Segments below this reach get audience expansion turned on.
pub const AUDIENCE_EXPANSION_THRESHOLD: u64 = 50_000;
/// Segments below this confidence get a hint to strengthen their rules.
const LOW_CONFIDENCE: f64 = 0.5;

// LinkedIn daily-budget tiers.
const LINKEDIN_FULL_FUNNEL_DAILY: f64 = 100.0;
const LINKEDIN_SPONSORED_DAILY: f64 = 25.0;
// Google daily budget above which conversion bidding is chosen.
const GOOGLE_SMART_BIDDING_DAILY: f64 = 50.0;

pub struct StructureAssembler {
    registry: Arc<ConstraintRegistry>,
    linkedin_share: f64,
}

impl StructureAssembler {
    pub fn new(registry: Arc<ConstraintRegistry>, linkedin_share: f64) -> Self {
        Self {
            registry,
            linkedin_share: linkedin_share.clamp(0.0, 1.0),
        }
    }

    /// Total budget per platform. A single-platform campaign gets all of it.
    pub fn budget_split(&self, platform_type: PlatformType, total: f64) -> Vec<(Platform, f64)> {
        match platform_type {
            PlatformType::Linkedin => vec![(Platform::Linkedin, total)],
            PlatformType::Google => vec![(Platform::Google, total)],
            PlatformType::Both => {
                let linkedin = total * self.linkedin_share;
                vec![(Platform::Linkedin, linkedin), (Platform::Google, total - linkedin)]
            }
        }
    }

    /// Settings for one validated segment given its share of the budget.
    pub fn assemble(&self, segment: &AudienceSegment, budget: f64, days: i64) -> CampaignResult<PlatformSettings> {
        let constraints = self.registry.get(segment.platform)?;
        let days = days.max(1);
        let daily_budget = budget / days as f64;
        if !daily_budget.is_finite() || daily_budget < constraints.min_daily_budget {
            return Err(CampaignError::validation(
                ValidationCode::InvalidBudget,
                "budget",
                format!(
                    "{} daily budget {:.2} over {days} days is below the minimum of {:.2}",
                    segment.platform, daily_budget, constraints.min_daily_budget
                ),
            ));
        }

        let (campaign_type, bid_strategy, ad_formats) = match segment.platform {
            Platform::Linkedin => {
                if daily_budget >= LINKEDIN_FULL_FUNNEL_DAILY {
                    (
                        CampaignType::SponsoredContent,
                        BidStrategy::CostCap,
                        vec![AdFormat::SingleImage, AdFormat::Carousel, AdFormat::Video],
                    )
                } else if daily_budget >= LINKEDIN_SPONSORED_DAILY {
                    (
                        CampaignType::SponsoredContent,
                        BidStrategy::MaximumDelivery,
                        vec![AdFormat::SingleImage, AdFormat::Carousel],
                    )
                } else {
                    (CampaignType::TextAds, BidStrategy::ManualCpc, vec![AdFormat::Text])
                }
            }
            Platform::Google => {
                let display = segment
                    .active_rules()
                    .any(|r| matches!(r.rule_type, RuleType::Interest | RuleType::Behavior));
                let smart = daily_budget >= GOOGLE_SMART_BIDDING_DAILY;
                if display {
                    let bid = if smart { BidStrategy::TargetCpa } else { BidStrategy::MaximizeClicks };
                    (CampaignType::Display, bid, vec![AdFormat::ResponsiveDisplay])
                } else {
                    let bid = if smart {
                        BidStrategy::MaximizeConversions
                    } else {
                        BidStrategy::MaximizeClicks
                    };
                    (CampaignType::Search, bid, vec![AdFormat::ResponsiveSearch])
                }
            }
        };

        let settings = PlatformSettings {
            platform: segment.platform,
            campaign_type,
            bid_strategy,
            daily_budget,
            total_budget: budget,
            ad_formats,
            audience_expansion: segment.estimated_reach < AUDIENCE_EXPANSION_THRESHOLD,
        };
        debug!(
            platform = %settings.platform,
            campaign_type = ?settings.campaign_type,
            bid_strategy = ?settings.bid_strategy,
            daily_budget,
            "Platform settings assembled"
        );
        Ok(settings)
    }

    /// Advisory hints derived from the committed segments and settings.
    pub fn hints(&self, segments: &[AudienceSegment], settings: &[PlatformSettings]) -> OptimizationHints {
        let mut hints = OptimizationHints::default();
        for s in settings {
            let Some(segment) = segments.iter().find(|seg| seg.platform == s.platform) else {
                continue;
            };
            let floor = self
                .registry
                .get(s.platform)
                .map(|c| c.min_daily_budget)
                .unwrap_or(0.0);
            // Scale spend with how much the rules are trusted.
            let recommended = (s.daily_budget * (0.5 + segment.confidence / 2.0)).max(floor);
            hints.budget_hints.push(BudgetHint {
                platform: s.platform,
                recommended_daily_budget: recommended,
            });

            if segment.estimated_reach < AUDIENCE_EXPANSION_THRESHOLD {
                hints.expand_audience = true;
                hints.notes.push(format!(
                    "{} reach of {} is narrow; audience expansion is enabled",
                    s.platform, segment.estimated_reach
                ));
            }
            if segment.confidence < LOW_CONFIDENCE {
                hints.notes.push(format!(
                    "{} segment confidence {:.2} is low; raise rule weights or add signals",
                    s.platform, segment.confidence
                ));
            }
        }
        hints
    }
}

// ─── Platform adapter ───────────────────────────────────────────────────────

/// Ad-platform check run on each assembled structure before commit.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    async fn validate_structure(&self, settings: &PlatformSettings) -> CampaignResult<()>;
}

/// Offline adapter: checks campaign types and ad formats against what each
/// platform accepts.
#[derive(Debug, Default, Clone)]
pub struct LocalPlatformAdapter;

impl LocalPlatformAdapter {
    fn accepts_type(platform: Platform, campaign_type: CampaignType) -> bool {
        match platform {
            Platform::Linkedin => matches!(campaign_type, CampaignType::SponsoredContent | CampaignType::TextAds),
            Platform::Google => matches!(campaign_type, CampaignType::Search | CampaignType::Display),
        }
    }

    fn accepts_format(platform: Platform, format: AdFormat) -> bool {
        match platform {
            Platform::Linkedin => matches!(
                format,
                AdFormat::SingleImage | AdFormat::Carousel | AdFormat::Video | AdFormat::Text
            ),
            Platform::Google => matches!(format, AdFormat::ResponsiveSearch | AdFormat::ResponsiveDisplay),
        }
    }
}

#[async_trait]
impl PlatformAdapter for LocalPlatformAdapter {
    async fn validate_structure(&self, settings: &PlatformSettings) -> CampaignResult<()> {
        let mut issues = Vec::new();
        if !Self::accepts_type(settings.platform, settings.campaign_type) {
            issues.push(ValidationIssue::new(
                ValidationCode::InvalidFormat,
                "platform_settings.campaign_type",
                format!("{:?} campaigns are not offered on {}", settings.campaign_type, settings.platform),
            ));
        }
        if settings.ad_formats.is_empty() {
            issues.push(ValidationIssue::new(
                ValidationCode::InvalidFormat,
                "platform_settings.ad_formats",
                "at least one ad format is required",
            ));
        }
        for format in &settings.ad_formats {
            if !Self::accepts_format(settings.platform, *format) {
                issues.push(ValidationIssue::new(
                    ValidationCode::InvalidFormat,
                    "platform_settings.ad_formats",
                    format!("{format:?} is not offered on {}", settings.platform),
                ));
            }
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(CampaignError::Validation(issues))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_targeting::SegmentBuilder;

    fn assembler() -> StructureAssembler {
        StructureAssembler::new(Arc::new(ConstraintRegistry::new()), 0.5)
    }

    fn segment(platform: Platform, reach: u64) -> AudienceSegment {
        let mut segment = SegmentBuilder::new("Ops leaders", platform)
            .locations(vec!["US".into()], None, 0.8)
            .build();
        segment.estimated_reach = reach;
        segment.confidence = 0.8;
        segment
    }

    #[test]
    fn test_budget_split() {
        let a = assembler();
        assert_eq!(a.budget_split(PlatformType::Google, 900.0), vec![(Platform::Google, 900.0)]);
        assert_eq!(
            a.budget_split(PlatformType::Both, 1_000.0),
            vec![(Platform::Linkedin, 500.0), (Platform::Google, 500.0)]
        );
    }

    #[test]
    fn test_linkedin_tiers() {
        let a = assembler();
        let seg = segment(Platform::Linkedin, 2_000_000);
        let high = a.assemble(&seg, 3_000.0, 10).unwrap();
        assert_eq!(high.campaign_type, CampaignType::SponsoredContent);
        assert_eq!(high.bid_strategy, BidStrategy::CostCap);
        assert_eq!(high.daily_budget, 300.0);

        let mid = a.assemble(&seg, 500.0, 10).unwrap();
        assert_eq!(mid.bid_strategy, BidStrategy::MaximumDelivery);

        let low = a.assemble(&seg, 150.0, 10).unwrap();
        assert_eq!(low.campaign_type, CampaignType::TextAds);
        assert_eq!(low.ad_formats, vec![AdFormat::Text]);
        assert!(!low.audience_expansion);
    }

    #[test]
    fn test_daily_budget_below_minimum() {
        let err = assembler()
            .assemble(&segment(Platform::Linkedin, 2_000_000), 50.0, 30)
            .unwrap_err();
        assert!(err.has_issue(ValidationCode::InvalidBudget));
    }

    #[test]
    fn test_google_search_vs_display() {
        let a = assembler();
        let search = a.assemble(&segment(Platform::Google, 10_000), 300.0, 30).unwrap();
        assert_eq!(search.campaign_type, CampaignType::Search);
        assert_eq!(search.bid_strategy, BidStrategy::MaximizeClicks);
        assert!(search.audience_expansion);

        let display_seg = SegmentBuilder::new("Readers", Platform::Google)
            .interests(vec!["Cloud".into()], 0.7)
            .build();
        let display = a.assemble(&display_seg, 6_000.0, 30).unwrap();
        assert_eq!(display.campaign_type, CampaignType::Display);
        assert_eq!(display.bid_strategy, BidStrategy::TargetCpa);
    }

    #[test]
    fn test_hints_flag_narrow_and_weak_segments() {
        let a = assembler();
        let mut seg = segment(Platform::Google, 10_000);
        seg.confidence = 0.3;
        let settings = a.assemble(&seg, 300.0, 30).unwrap();
        let hints = a.hints(&[seg], &[settings]);
        assert!(hints.expand_audience);
        assert_eq!(hints.notes.len(), 2);
        assert_eq!(hints.budget_hints.len(), 1);
        assert!((hints.budget_hints[0].recommended_daily_budget - 6.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_local_adapter_rejects_foreign_formats() {
        let adapter = LocalPlatformAdapter;
        let mut settings = assembler()
            .assemble(&segment(Platform::Linkedin, 2_000_000), 3_000.0, 10)
            .unwrap();
        assert!(adapter.validate_structure(&settings).await.is_ok());

        settings.ad_formats.push(AdFormat::ResponsiveSearch);
        let err = adapter.validate_structure(&settings).await.unwrap_err();
        assert!(err.has_issue(ValidationCode::InvalidFormat));
    }
}
