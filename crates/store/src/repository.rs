//! Repository contract consumed by the generation pipeline.
//!
//! Writes are keyed by id and idempotent: repeating a `create` with the same
//! id replaces the record instead of failing, so retries are safe.

use async_trait::async_trait;
use campaign_core::types::{AudienceSegment, Campaign};
use campaign_core::CampaignError;
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for CampaignError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => CampaignError::NotFound(what),
            StoreError::Unavailable(msg) => CampaignError::System(format!("persistence: {msg}")),
        }
    }
}

#[async_trait]
pub trait CampaignRepository: Send + Sync {
    async fn create_campaign(&self, campaign: &Campaign) -> StoreResult<()>;

    async fn read_campaign(&self, id: Uuid) -> StoreResult<Option<Campaign>>;

    /// Replace an existing campaign; `NotFound` if it was never created.
    async fn update_campaign(&self, campaign: &Campaign) -> StoreResult<()>;

    /// Returns whether a record was removed.
    async fn delete_campaign(&self, id: Uuid) -> StoreResult<bool>;

    async fn create_segment(&self, segment: &AudienceSegment) -> StoreResult<()>;

    async fn read_segment(&self, id: Uuid) -> StoreResult<Option<AudienceSegment>>;

    async fn update_segment(&self, segment: &AudienceSegment) -> StoreResult<()>;

    async fn delete_segment(&self, id: Uuid) -> StoreResult<bool>;
}
