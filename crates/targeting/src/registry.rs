//! Platform constraint registry: per-network targeting limits, loaded once
//! at startup and shared read-only.

use campaign_core::types::{Platform, RuleType};
use campaign_core::{CampaignError, CampaignResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryLimits {
    pub max_industries: usize,
    pub requires_subsidiary_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySizeLimits {
    pub min_allowed: u32,
    pub max_allowed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationLimits {
    pub max_locations: usize,
    /// Allowed radius values; empty means radius targeting is unavailable.
    pub supported_radii: Vec<u32>,
}

/// Numeric and structural limits for one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformConstraints {
    pub platform: Platform,
    pub max_rules: usize,
    pub supported_rule_types: BTreeSet<RuleType>,
    pub min_reach: u64,
    pub max_reach: u64,
    /// Addressable population the reach heuristic narrows from.
    pub base_population: u64,
    pub max_name_length: usize,
    pub max_description_length: usize,
    pub min_daily_budget: f64,
    pub industry: Option<IndustryLimits>,
    pub company_size: Option<CompanySizeLimits>,
    pub location: Option<LocationLimits>,
}

impl PlatformConstraints {
    pub fn linkedin() -> Self {
        Self {
            platform: Platform::Linkedin,
            max_rules: 8,
            supported_rule_types: [
                RuleType::Industry,
                RuleType::CompanySize,
                RuleType::JobTitle,
                RuleType::Location,
                RuleType::Interest,
            ]
            .into_iter()
            .collect(),
            min_reach: 1_000,
            max_reach: 900_000_000,
            base_population: 1_000_000_000,
            max_name_length: 255,
            max_description_length: 2_000,
            min_daily_budget: 10.0,
            industry: Some(IndustryLimits {
                max_industries: 20,
                requires_subsidiary_flag: true,
            }),
            company_size: Some(CompanySizeLimits {
                min_allowed: 1,
                max_allowed: 10_001,
            }),
            location: Some(LocationLimits {
                max_locations: 50,
                supported_radii: vec![10, 25, 50],
            }),
        }
    }

    pub fn google() -> Self {
        Self {
            platform: Platform::Google,
            max_rules: 5,
            supported_rule_types: [
                RuleType::Industry,
                RuleType::Location,
                RuleType::Interest,
                RuleType::Behavior,
            ]
            .into_iter()
            .collect(),
            min_reach: 1_000,
            max_reach: 3_000_000_000,
            base_population: 4_000_000_000,
            max_name_length: 128,
            max_description_length: 1_000,
            min_daily_budget: 1.0,
            industry: Some(IndustryLimits {
                max_industries: 10,
                requires_subsidiary_flag: false,
            }),
            company_size: None,
            location: Some(LocationLimits {
                max_locations: 100,
                supported_radii: vec![1, 5, 10, 25, 50, 100],
            }),
        }
    }

    pub fn supports(&self, rule_type: RuleType) -> bool {
        self.supported_rule_types.contains(&rule_type)
    }
}

/// Immutable platform → constraints table.
#[derive(Debug, Clone)]
pub struct ConstraintRegistry {
    constraints: HashMap<Platform, PlatformConstraints>,
}

impl ConstraintRegistry {
    /// Registry with the built-in LinkedIn and Google limits.
    pub fn new() -> Self {
        Self::with_constraints([PlatformConstraints::linkedin(), PlatformConstraints::google()])
    }

    pub fn with_constraints(constraints: impl IntoIterator<Item = PlatformConstraints>) -> Self {
        Self {
            constraints: constraints.into_iter().map(|c| (c.platform, c)).collect(),
        }
    }

    pub fn get(&self, platform: Platform) -> CampaignResult<&PlatformConstraints> {
        self.constraints
            .get(&platform)
            .ok_or_else(|| CampaignError::UnknownPlatform(platform.to_string()))
    }

    /// Lookup by wire name, e.g. `"linkedin"`.
    pub fn get_by_name(&self, name: &str) -> CampaignResult<&PlatformConstraints> {
        let platform: Platform = name.parse()?;
        self.get(platform)
    }

    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<Platform> = self.constraints.keys().copied().collect();
        platforms.sort();
        platforms
    }
}

impl Default for ConstraintRegistry {
    fn default() -> Self {
        Self::new()
    }
}
