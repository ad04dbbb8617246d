//! Persistence collaborator for campaigns and audience segments.

pub mod memory;
pub mod repository;

pub use memory::InMemoryStore;
pub use repository::{CampaignRepository, StoreError, StoreResult};
