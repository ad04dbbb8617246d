//! In-memory repository backed by DashMap.
//!
//! Production deployments swap this for a durable store behind the same
//! `CampaignRepository` trait.

use crate::repository::{CampaignRepository, StoreError, StoreResult};
use async_trait::async_trait;
use campaign_core::types::{AudienceSegment, Campaign, ProcessingStatus};
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

pub struct InMemoryStore {
    campaigns: DashMap<Uuid, Campaign>,
    segments: DashMap<Uuid, AudienceSegment>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        info!("Campaign store initialized (in-memory)");
        Self {
            campaigns: DashMap::new(),
            segments: DashMap::new(),
        }
    }

    pub fn campaign_count(&self) -> usize {
        self.campaigns.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Newest first.
    pub fn list_campaigns(&self) -> Vec<Campaign> {
        let mut campaigns: Vec<Campaign> = self.campaigns.iter().map(|r| r.value().clone()).collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        campaigns
    }

    pub fn count_by_status(&self, status: ProcessingStatus) -> usize {
        self.campaigns
            .iter()
            .filter(|r| r.value().processing_status == status)
            .count()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CampaignRepository for InMemoryStore {
    async fn create_campaign(&self, campaign: &Campaign) -> StoreResult<()> {
        debug!(campaign_id = %campaign.id, status = ?campaign.processing_status, "Storing campaign");
        self.campaigns.insert(campaign.id, campaign.clone());
        Ok(())
    }

    async fn read_campaign(&self, id: Uuid) -> StoreResult<Option<Campaign>> {
        Ok(self.campaigns.get(&id).map(|r| r.value().clone()))
    }

    async fn update_campaign(&self, campaign: &Campaign) -> StoreResult<()> {
        match self.campaigns.get_mut(&campaign.id) {
            Some(mut entry) => {
                *entry.value_mut() = campaign.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("campaign {}", campaign.id))),
        }
    }

    async fn delete_campaign(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.campaigns.remove(&id).is_some())
    }

    async fn create_segment(&self, segment: &AudienceSegment) -> StoreResult<()> {
        debug!(segment_id = %segment.id, platform = %segment.platform, "Storing segment");
        self.segments.insert(segment.id, segment.clone());
        Ok(())
    }

    async fn read_segment(&self, id: Uuid) -> StoreResult<Option<AudienceSegment>> {
        Ok(self.segments.get(&id).map(|r| r.value().clone()))
    }

    async fn update_segment(&self, segment: &AudienceSegment) -> StoreResult<()> {
        match self.segments.get_mut(&segment.id) {
            Some(mut entry) => {
                *entry.value_mut() = segment.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("segment {}", segment.id))),
        }
    }

    async fn delete_segment(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.segments.remove(&id).is_some())
    }
}
