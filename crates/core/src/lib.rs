//! Shared data model, error taxonomy and configuration for campaign generation.

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{CampaignError, CampaignResult, ErrorCode, ValidationCode, ValidationIssue};
