//! Records what a generation run has written so a failed or timed-out run
//! can be undone.

use campaign_store::CampaignRepository;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct CommitJournal {
    segments: Mutex<Vec<Uuid>>,
    campaign_written: AtomicBool,
}

impl CommitJournal {
    /// Called before the write is issued; deleting an id that never landed
    /// is a no-op.
    pub fn record_segment(&self, id: Uuid) {
        let mut segments = self.segments.lock();
        if !segments.contains(&id) {
            segments.push(id);
        }
    }

    pub fn record_campaign(&self) {
        self.campaign_written.store(true, Ordering::SeqCst);
    }

    pub fn segments(&self) -> Vec<Uuid> {
        self.segments.lock().clone()
    }

    pub fn campaign_written(&self) -> bool {
        self.campaign_written.load(Ordering::SeqCst)
    }

    /// Delete every journaled segment. Failures are logged and skipped.
    /// Returns the number of records actually removed.
    pub async fn rollback(&self, repository: &dyn CampaignRepository) -> usize {
        let ids = std::mem::take(&mut *self.segments.lock());
        let mut removed = 0;
        for id in &ids {
            match repository.delete_segment(*id).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!(segment_id = %id, error = %e, "Rollback could not delete segment"),
            }
        }
        if !ids.is_empty() {
            info!(journaled = ids.len(), removed, "Generation writes rolled back");
        }
        removed
    }
}
