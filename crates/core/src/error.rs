use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type CampaignResult<T> = Result<T, CampaignError>;

/// Top-level failure code surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    GenerationTimeout,
    SystemError,
    NotFound,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::GenerationTimeout => "GENERATION_TIMEOUT",
            ErrorCode::SystemError => "SYSTEM_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
        }
    }
}

/// Sub-kind of a `VALIDATION_ERROR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    UnsupportedRuleType,
    ExceededRuleLimit,
    InvalidAudienceSize,
    InvalidFormat,
    InvalidOptimizationSettings,
    InvalidCriteria,
    InvalidWeight,
    InvalidBudget,
    InvalidDateRange,
}

/// One accumulated validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: ValidationCode,
    pub field: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
}

impl ValidationIssue {
    pub fn new(code: ValidationCode, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            field: field.into(),
            message: message.into(),
            rule_id: None,
        }
    }

    pub fn for_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }
}

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Validation failed with {} issue(s)", .0.len())]
    Validation(Vec<ValidationIssue>),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Campaign generation exceeded the {deadline_ms} ms deadline")]
    GenerationTimeout { deadline_ms: u64 },

    #[error("System error: {0}")]
    System(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CampaignError {
    /// Single-issue validation error.
    pub fn validation(code: ValidationCode, field: impl Into<String>, message: impl Into<String>) -> Self {
        CampaignError::Validation(vec![ValidationIssue::new(code, field, message)])
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            CampaignError::Validation(_) | CampaignError::UnknownPlatform(_) => {
                ErrorCode::ValidationError
            }
            CampaignError::InvalidState(_) => ErrorCode::ValidationError,
            CampaignError::GenerationTimeout { .. } => ErrorCode::GenerationTimeout,
            CampaignError::NotFound(_) => ErrorCode::NotFound,
            CampaignError::System(_)
            | CampaignError::Config(_)
            | CampaignError::Serialization(_)
            | CampaignError::Internal(_) => ErrorCode::SystemError,
        }
    }

    /// Only collaborator failures are retried; validation errors and
    /// timeouts are terminal for the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CampaignError::System(_))
    }

    /// Accumulated issues, empty for non-validation errors.
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            CampaignError::Validation(issues) => issues,
            _ => &[],
        }
    }

    pub fn has_issue(&self, code: ValidationCode) -> bool {
        self.issues().iter().any(|i| i.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = CampaignError::validation(ValidationCode::ExceededRuleLimit, "targeting_rules", "too many");
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(err.has_issue(ValidationCode::ExceededRuleLimit));
        assert!(!err.is_retryable());

        let err = CampaignError::GenerationTimeout { deadline_ms: 30_000 };
        assert_eq!(err.code(), ErrorCode::GenerationTimeout);
        assert!(!err.is_retryable());

        let err = CampaignError::System("store unavailable".into());
        assert_eq!(err.code(), ErrorCode::SystemError);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_codes_serialize_screaming_snake() {
        let json = serde_json::to_string(&ValidationCode::InvalidAudienceSize).unwrap();
        assert_eq!(json, "\"INVALID_AUDIENCE_SIZE\"");
        let json = serde_json::to_string(&ErrorCode::GenerationTimeout).unwrap();
        assert_eq!(json, "\"GENERATION_TIMEOUT\"");
    }
}
