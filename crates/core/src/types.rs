use crate::error::{CampaignError, CampaignResult, ErrorCode, ValidationCode, ValidationIssue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ─── Platforms ─────────────────────────────────────────────────────────────

/// An external ad network with its own targeting limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linkedin,
    Google,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Linkedin, Platform::Google];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linkedin => "linkedin",
            Platform::Google => "google",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CampaignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linkedin" => Ok(Platform::Linkedin),
            "google" => Ok(Platform::Google),
            other => Err(CampaignError::UnknownPlatform(other.to_string())),
        }
    }
}

/// Platform selection for a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlatformType {
    Linkedin,
    Google,
    Both,
}

impl PlatformType {
    pub fn platforms(&self) -> Vec<Platform> {
        match self {
            PlatformType::Linkedin => vec![Platform::Linkedin],
            PlatformType::Google => vec![Platform::Google],
            PlatformType::Both => vec![Platform::Linkedin, Platform::Google],
        }
    }
}

// ─── Targeting Rules ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Industry,
    CompanySize,
    JobTitle,
    Location,
    Interest,
    Behavior,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Industry => "industry",
            RuleType::CompanySize => "company_size",
            RuleType::JobTitle => "job_title",
            RuleType::Location => "location",
            RuleType::Interest => "interest",
            RuleType::Behavior => "behavior",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperator {
    Include,
    Exclude,
    Between,
    GreaterThan,
    LessThan,
}

impl RuleOperator {
    /// Operators that compare numeric ranges rather than membership.
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            RuleOperator::Between | RuleOperator::GreaterThan | RuleOperator::LessThan
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seniority {
    Entry,
    Senior,
    Manager,
    Director,
    Vp,
    CLevel,
    Owner,
    Partner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Phrase,
    Broad,
}

/// Rule criteria, one strongly-typed shape per rule type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Criteria {
    Industry {
        industries: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        include_subsidiaries: Option<bool>,
    },
    CompanySize {
        min_size: u32,
        max_size: u32,
    },
    JobTitle {
        titles: Vec<String>,
        #[serde(default)]
        seniority: Vec<Seniority>,
    },
    Location {
        countries: Vec<String>,
        #[serde(default)]
        regions: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        radius: Option<u32>,
    },
    Interest {
        categories: Vec<String>,
        #[serde(default)]
        keywords: Vec<String>,
    },
    Behavior {
        behaviors: Vec<String>,
        match_type: MatchType,
    },
}

impl Criteria {
    pub fn rule_type(&self) -> RuleType {
        match self {
            Criteria::Industry { .. } => RuleType::Industry,
            Criteria::CompanySize { .. } => RuleType::CompanySize,
            Criteria::JobTitle { .. } => RuleType::JobTitle,
            Criteria::Location { .. } => RuleType::Location,
            Criteria::Interest { .. } => RuleType::Interest,
            Criteria::Behavior { .. } => RuleType::Behavior,
        }
    }
}

/// One atomic audience-selection criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetingRule {
    pub id: String,
    pub rule_type: RuleType,
    pub operator: RuleOperator,
    pub criteria: Criteria,
    pub weight: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl TargetingRule {
    /// Active `include` rule whose type is taken from the criteria.
    pub fn include(criteria: Criteria, weight: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            rule_type: criteria.rule_type(),
            operator: RuleOperator::Include,
            criteria,
            weight,
            is_active: true,
        }
    }

    pub fn exclude(criteria: Criteria, weight: f64) -> Self {
        Self {
            operator: RuleOperator::Exclude,
            ..Self::include(criteria, weight)
        }
    }
}

// ─── Audience Segments ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentMetadata {
    #[serde(default)]
    pub last_optimized: Option<DateTime<Utc>>,
    #[serde(default)]
    pub performance_score: Option<f64>,
    #[serde(default)]
    pub recommended_budget: Option<f64>,
    /// Segment this one was synced from, if any.
    #[serde(default)]
    pub source_segment_id: Option<Uuid>,
}

/// A named, platform-scoped collection of targeting rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudienceSegment {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub platform: Platform,
    pub targeting_rules: Vec<TargetingRule>,
    #[serde(default)]
    pub estimated_reach: u64,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub metadata: Option<SegmentMetadata>,
}

impl AudienceSegment {
    pub fn active_rules(&self) -> impl Iterator<Item = &TargetingRule> {
        self.targeting_rules.iter().filter(|r| r.is_active)
    }
}

/// Caller-supplied targeting used to build segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetingInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rules: Vec<TargetingRule>,
}

// ─── Campaigns ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub const MAX_DAYS: i64 = 365;

    /// Duration in whole days, rounded up.
    pub fn duration_days(&self) -> i64 {
        let secs = (self.end - self.start).num_seconds();
        if secs <= 0 {
            return 0;
        }
        (secs + 86_399) / 86_400
    }

    pub fn validate(&self, now: DateTime<Utc>) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.start >= self.end {
            issues.push(ValidationIssue::new(
                ValidationCode::InvalidDateRange,
                "date_range",
                "start must be before end",
            ));
        }
        if self.start <= now {
            issues.push(ValidationIssue::new(
                ValidationCode::InvalidDateRange,
                "date_range.start",
                "start must be in the future",
            ));
        }
        let days = self.duration_days();
        if self.start < self.end && !(1..=Self::MAX_DAYS).contains(&days) {
            issues.push(ValidationIssue::new(
                ValidationCode::InvalidDateRange,
                "date_range",
                format!("duration of {days} days is outside [1, {}]", Self::MAX_DAYS),
            ));
        }
        issues
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Archived,
}

/// Generation lifecycle: QUEUED → PROCESSING → {COMPLETED | FAILED}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Failed)
    }

    pub fn can_transition_to(&self, next: ProcessingStatus) -> bool {
        use ProcessingStatus::*;
        matches!(
            (self, next),
            (Queued, Processing) | (Queued, Failed) | (Processing, Completed) | (Processing, Failed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignType {
    SponsoredContent,
    TextAds,
    Search,
    Display,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BidStrategy {
    ManualCpc,
    MaximumDelivery,
    CostCap,
    MaximizeClicks,
    MaximizeConversions,
    TargetCpa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdFormat {
    SingleImage,
    Carousel,
    Video,
    Text,
    ResponsiveSearch,
    ResponsiveDisplay,
}

/// Per-platform structural payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSettings {
    pub platform: Platform,
    pub campaign_type: CampaignType,
    pub bid_strategy: BidStrategy,
    pub daily_budget: f64,
    pub total_budget: f64,
    pub ad_formats: Vec<AdFormat>,
    pub audience_expansion: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetingSettings {
    pub segments: Vec<AudienceSegment>,
}

impl TargetingSettings {
    pub fn segment_for(&self, platform: Platform) -> Option<&AudienceSegment> {
        self.segments.iter().find(|s| s.platform == platform)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetHint {
    pub platform: Platform,
    pub recommended_daily_budget: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationHints {
    pub budget_hints: Vec<BudgetHint>,
    pub expand_audience: bool,
    pub notes: Vec<String>,
}

/// Why a generation request ended in `FAILED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationFailure {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default)]
    pub issues: Vec<ValidationIssue>,
}

impl From<&CampaignError> for GenerationFailure {
    fn from(err: &CampaignError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            issues: err.issues().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub platform_type: PlatformType,
    pub total_budget: f64,
    pub date_range: DateRange,
    pub status: CampaignStatus,
    pub processing_status: ProcessingStatus,
    pub targeting_settings: TargetingSettings,
    pub platform_settings: Vec<PlatformSettings>,
    pub optimization_hints: OptimizationHints,
    #[serde(default)]
    pub failure: Option<GenerationFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// A freshly accepted generation request.
    pub fn queued(id: Uuid, request: &GenerationRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: request.targeting.name.clone(),
            platform_type: request.platform_type,
            total_budget: request.budget,
            date_range: request.date_range,
            status: CampaignStatus::Draft,
            processing_status: ProcessingStatus::Queued,
            targeting_settings: TargetingSettings::default(),
            platform_settings: Vec::new(),
            optimization_hints: OptimizationHints::default(),
            failure: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, next: ProcessingStatus) -> CampaignResult<()> {
        if !self.processing_status.can_transition_to(next) {
            return Err(CampaignError::InvalidState(format!(
                "campaign {} cannot move from {:?} to {:?}",
                self.id, self.processing_status, next
            )));
        }
        self.processing_status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Terminal failure record; forces `FAILED` from any state.
    pub fn mark_failed(&mut self, err: &CampaignError) {
        self.processing_status = ProcessingStatus::Failed;
        self.failure = Some(GenerationFailure::from(err));
        self.updated_at = Utc::now();
    }
}

// ─── Requests ──────────────────────────────────────────────────────────────

/// Input of `generateCampaignStructure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub platform_type: PlatformType,
    pub targeting: TargetingInput,
    pub budget: f64,
    pub date_range: DateRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSettings {
    pub min_confidence: f64,
    pub budget_constraint: f64,
    #[serde(default)]
    pub max_suggestions: Option<usize>,
}

impl OptimizationSettings {
    pub fn validate(&self) -> CampaignResult<()> {
        let mut issues = Vec::new();
        if !(0.0..=1.0).contains(&self.min_confidence) {
            issues.push(ValidationIssue::new(
                ValidationCode::InvalidOptimizationSettings,
                "min_confidence",
                format!("min_confidence {} must be within [0, 1]", self.min_confidence),
            ));
        }
        if !self.budget_constraint.is_finite() || self.budget_constraint < 0.0 {
            issues.push(ValidationIssue::new(
                ValidationCode::InvalidOptimizationSettings,
                "budget_constraint",
                format!("budget_constraint {} must be a finite non-negative amount", self.budget_constraint),
            ));
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(CampaignError::Validation(issues))
        }
    }
}

/// A ranked rule proposal from the suggestion collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSuggestion {
    pub rule: TargetingRule,
    pub confidence: f64,
    #[serde(default)]
    pub rationale: String,
}
