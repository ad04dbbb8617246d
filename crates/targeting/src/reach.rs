//! Reach and confidence heuristics.
//!
//! Every active rule narrows the platform's base population by a
//! rule-type-specific selectivity in (0, 1]. `include` keeps that share,
//! `exclude` removes it.

use crate::registry::PlatformConstraints;
use campaign_core::types::{Criteria, MatchType, RuleOperator, TargetingRule};

const MIN_SELECTIVITY: f64 = 0.000_1;
/// Share of the audience an exclusion can never remove.
const MIN_EXCLUSION_REMAINDER: f64 = 0.01;

const INDUSTRY_SHARE: f64 = 0.04;
const JOB_TITLE_SHARE: f64 = 0.005;
const SENIORITY_LEVELS: f64 = 8.0;
const COUNTRY_SHARE: f64 = 0.03;
const REGION_SHARE: f64 = 0.01;
const RADIUS_REFERENCE: f64 = 100.0;
const INTEREST_SHARE: f64 = 0.05;
const KEYWORD_SHARE: f64 = 0.01;
/// Upper end of the company-size scale used for log-range coverage.
const COMPANY_SIZE_CEILING: f64 = 10_002.0;

/// Fraction of the population a single rule's criteria matches.
pub fn rule_selectivity(rule: &TargetingRule) -> f64 {
    let raw = match &rule.criteria {
        Criteria::Industry { industries, .. } => INDUSTRY_SHARE * industries.len() as f64,
        Criteria::CompanySize { min_size, max_size } => {
            let lo = (*min_size).max(1) as f64;
            let hi = (*max_size as f64 + 1.0).max(lo);
            (hi.ln() - lo.ln()) / COMPANY_SIZE_CEILING.ln()
        }
        Criteria::JobTitle { titles, seniority } => {
            let seniority_share = if seniority.is_empty() {
                1.0
            } else {
                seniority.len() as f64 / SENIORITY_LEVELS
            };
            JOB_TITLE_SHARE * titles.len() as f64 * seniority_share
        }
        Criteria::Location {
            countries,
            regions,
            radius,
        } => {
            let area = COUNTRY_SHARE * countries.len() as f64 + REGION_SHARE * regions.len() as f64;
            match radius {
                Some(r) => area * (*r as f64 / RADIUS_REFERENCE).min(1.0),
                None => area,
            }
        }
        Criteria::Interest { categories, keywords } => {
            INTEREST_SHARE * categories.len() as f64 + KEYWORD_SHARE * keywords.len() as f64
        }
        Criteria::Behavior {
            behaviors,
            match_type,
        } => {
            let per_behavior = match match_type {
                MatchType::Exact => 0.01,
                MatchType::Phrase => 0.03,
                MatchType::Broad => 0.08,
            };
            per_behavior * behaviors.len() as f64
        }
    };
    if raw.is_finite() {
        raw.clamp(MIN_SELECTIVITY, 1.0)
    } else {
        MIN_SELECTIVITY
    }
}

/// Unclamped reach estimate over active rules, in rule order.
pub fn estimate_reach(rules: &[TargetingRule], constraints: &PlatformConstraints) -> u64 {
    let reach = rules
        .iter()
        .filter(|r| r.is_active)
        .fold(constraints.base_population as f64, |reach, rule| {
            let s = rule_selectivity(rule);
            match rule.operator {
                RuleOperator::Exclude => reach * (1.0 - s).max(MIN_EXCLUSION_REMAINDER),
                _ => reach * s,
            }
        });
    reach.max(0.0).round() as u64
}

/// Weight-renormalized average of active rule weights: Σw² / Σw.
/// Zero when there are no active rules or all weights are zero.
pub fn confidence(rules: &[TargetingRule]) -> f64 {
    let (sum, sum_sq) = rules
        .iter()
        .filter(|r| r.is_active)
        .map(|r| r.weight.clamp(0.0, 1.0))
        .fold((0.0, 0.0), |(s, sq), w| (s + w, sq + w * w));
    if sum <= 0.0 {
        0.0
    } else {
        (sum_sq / sum).clamp(0.0, 1.0)
    }
}
