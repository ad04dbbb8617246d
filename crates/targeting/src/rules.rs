//! Per-rule validation against a platform's constraints.
//!
//! Validation never stops at the first problem: every applicable check runs
//! so callers can report all issues for a rule at once.

use crate::registry::PlatformConstraints;
use campaign_core::types::{Criteria, RuleType, TargetingRule};
use campaign_core::{ValidationCode, ValidationIssue};
use serde::{Deserialize, Serialize};

/// Outcome of validating one rule or a rule list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleValidation {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
}

impl RuleValidation {
    fn from_errors(errors: Vec<ValidationIssue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

pub struct RuleValidator;

impl RuleValidator {
    pub fn validate(rule: &TargetingRule, constraints: &PlatformConstraints) -> RuleValidation {
        let mut errors = Vec::new();
        Self::collect(rule, constraints, &mut errors);
        RuleValidation::from_errors(errors)
    }

    /// Validate a rule list: the rule-count limit plus every rule.
    pub fn validate_all(rules: &[TargetingRule], constraints: &PlatformConstraints) -> RuleValidation {
        let mut errors = Vec::new();
        if rules.len() > constraints.max_rules {
            errors.push(ValidationIssue::new(
                ValidationCode::ExceededRuleLimit,
                "targeting_rules",
                format!(
                    "{} rules exceed the {} limit of {}",
                    rules.len(),
                    constraints.platform,
                    constraints.max_rules
                ),
            ));
        }
        for rule in rules {
            Self::collect(rule, constraints, &mut errors);
        }
        RuleValidation::from_errors(errors)
    }

    fn collect(rule: &TargetingRule, constraints: &PlatformConstraints, errors: &mut Vec<ValidationIssue>) {
        let mut push = |code: ValidationCode, field: &str, message: String| {
            errors.push(ValidationIssue::new(code, field, message).for_rule(rule.id.clone()));
        };

        if rule.id.trim().is_empty() {
            push(ValidationCode::InvalidFormat, "id", "rule id must not be empty".into());
        }

        if !constraints.supports(rule.rule_type) {
            push(
                ValidationCode::UnsupportedRuleType,
                "rule_type",
                format!("{} does not support {} targeting", constraints.platform, rule.rule_type),
            );
        }

        if rule.operator.is_range() && rule.rule_type != RuleType::CompanySize {
            push(
                ValidationCode::InvalidCriteria,
                "operator",
                format!("operator {:?} only applies to company_size rules", rule.operator),
            );
        }

        if rule.criteria.rule_type() != rule.rule_type {
            push(
                ValidationCode::InvalidCriteria,
                "criteria",
                format!(
                    "criteria of type {} does not match rule type {}",
                    rule.criteria.rule_type(),
                    rule.rule_type
                ),
            );
        } else {
            for (field, message) in criteria_violations(&rule.criteria, constraints) {
                push(ValidationCode::InvalidCriteria, field, message);
            }
        }

        if !(0.0..=1.0).contains(&rule.weight) {
            push(
                ValidationCode::InvalidWeight,
                "weight",
                format!("weight {} must be within [0, 1]", rule.weight),
            );
        }
    }
}

fn criteria_violations(criteria: &Criteria, constraints: &PlatformConstraints) -> Vec<(&'static str, String)> {
    let mut out = Vec::new();
    match criteria {
        Criteria::Industry {
            industries,
            include_subsidiaries,
        } => {
            check_list(&mut out, "criteria.industries", industries);
            if let Some(limits) = &constraints.industry {
                if industries.len() > limits.max_industries {
                    out.push((
                        "criteria.industries",
                        format!(
                            "{} industries exceed the maximum of {}",
                            industries.len(),
                            limits.max_industries
                        ),
                    ));
                }
                if limits.requires_subsidiary_flag && include_subsidiaries.is_none() {
                    out.push((
                        "criteria.include_subsidiaries",
                        format!("{} requires include_subsidiaries to be set", constraints.platform),
                    ));
                }
            }
        }
        Criteria::CompanySize { min_size, max_size } => {
            if *min_size == 0 {
                out.push(("criteria.min_size", "min_size must be positive".into()));
            }
            if min_size > max_size {
                out.push((
                    "criteria.min_size",
                    format!("min_size {min_size} exceeds max_size {max_size}"),
                ));
            }
            if let Some(limits) = &constraints.company_size {
                let allowed = limits.min_allowed..=limits.max_allowed;
                for (field, value) in [("criteria.min_size", min_size), ("criteria.max_size", max_size)] {
                    if !allowed.contains(value) {
                        out.push((
                            field,
                            format!(
                                "{value} is outside the allowed range [{}, {}]",
                                limits.min_allowed, limits.max_allowed
                            ),
                        ));
                    }
                }
            }
        }
        Criteria::Location {
            countries,
            regions,
            radius,
        } => {
            check_list(&mut out, "criteria.countries", countries);
            if regions.iter().any(|r| r.trim().is_empty()) {
                out.push(("criteria.regions", "regions must not contain blank entries".into()));
            }
            if let Some(limits) = &constraints.location {
                if countries.len() > limits.max_locations {
                    out.push((
                        "criteria.countries",
                        format!(
                            "{} locations exceed the maximum of {}",
                            countries.len(),
                            limits.max_locations
                        ),
                    ));
                }
                if let Some(radius) = radius {
                    if !limits.supported_radii.contains(radius) {
                        out.push((
                            "criteria.radius",
                            format!(
                                "radius {radius} is not one of {:?}",
                                limits.supported_radii
                            ),
                        ));
                    }
                }
            }
        }
        Criteria::JobTitle { titles, .. } => check_list(&mut out, "criteria.titles", titles),
        Criteria::Interest { categories, keywords } => {
            check_list(&mut out, "criteria.categories", categories);
            if keywords.iter().any(|k| k.trim().is_empty()) {
                out.push(("criteria.keywords", "keywords must not contain blank entries".into()));
            }
        }
        Criteria::Behavior { behaviors, .. } => check_list(&mut out, "criteria.behaviors", behaviors),
    }
    out
}

/// Non-empty list without blank entries.
fn check_list(out: &mut Vec<(&'static str, String)>, field: &'static str, values: &[String]) {
    if values.is_empty() {
        out.push((field, format!("{field} must not be empty")));
    } else if values.iter().any(|v| v.trim().is_empty()) {
        out.push((field, format!("{field} must not contain blank entries")));
    }
}
