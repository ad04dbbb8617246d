//! Segment builder: fluent API for assembling targeting rules.

use campaign_core::types::{
    AudienceSegment, Criteria, MatchType, Platform, RuleOperator, Seniority, TargetingInput, TargetingRule,
};
use uuid::Uuid;

pub struct SegmentBuilder {
    name: String,
    description: String,
    platform: Platform,
    rules: Vec<TargetingRule>,
}

impl SegmentBuilder {
    pub fn new(name: impl Into<String>, platform: Platform) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            platform,
            rules: Vec::new(),
        }
    }

    /// Start from caller-supplied targeting; rule order is preserved.
    pub fn from_input(input: &TargetingInput, platform: Platform) -> Self {
        Self {
            name: input.name.clone(),
            description: input.description.clone(),
            platform,
            rules: input.rules.clone(),
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn rule(mut self, rule: TargetingRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn industries(mut self, industries: Vec<String>, include_subsidiaries: Option<bool>, weight: f64) -> Self {
        self.rules.push(TargetingRule::include(
            Criteria::Industry {
                industries,
                include_subsidiaries,
            },
            weight,
        ));
        self
    }

    pub fn company_size(mut self, min_size: u32, max_size: u32, weight: f64) -> Self {
        let mut rule = TargetingRule::include(Criteria::CompanySize { min_size, max_size }, weight);
        rule.operator = RuleOperator::Between;
        self.rules.push(rule);
        self
    }

    pub fn job_titles(mut self, titles: Vec<String>, seniority: Vec<Seniority>, weight: f64) -> Self {
        self.rules
            .push(TargetingRule::include(Criteria::JobTitle { titles, seniority }, weight));
        self
    }

    pub fn locations(mut self, countries: Vec<String>, radius: Option<u32>, weight: f64) -> Self {
        self.rules.push(TargetingRule::include(
            Criteria::Location {
                countries,
                regions: Vec::new(),
                radius,
            },
            weight,
        ));
        self
    }

    pub fn interests(mut self, categories: Vec<String>, weight: f64) -> Self {
        self.rules.push(TargetingRule::include(
            Criteria::Interest {
                categories,
                keywords: Vec::new(),
            },
            weight,
        ));
        self
    }

    pub fn behaviors(mut self, behaviors: Vec<String>, match_type: MatchType, weight: f64) -> Self {
        self.rules.push(TargetingRule::include(
            Criteria::Behavior {
                behaviors,
                match_type,
            },
            weight,
        ));
        self
    }

    pub fn excluding(mut self, criteria: Criteria, weight: f64) -> Self {
        self.rules.push(TargetingRule::exclude(criteria, weight));
        self
    }

    /// Unvalidated segment; reach and confidence are filled in by validation.
    pub fn build(self) -> AudienceSegment {
        AudienceSegment {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            platform: self.platform,
            targeting_rules: self.rules,
            estimated_reach: 0,
            confidence: 0.0,
            metadata: None,
        }
    }
}
