//! Campaign generation pipeline: orchestrates segment validation, platform
//! structure assembly and persistence under a single deadline, with progress
//! reporting and bounded retries.

pub mod instrument;
pub mod journal;
pub mod orchestrator;
pub mod retry;
pub mod service;
pub mod structure;
pub mod supervisor;

pub use orchestrator::{GenerationContext, GenerationOrchestrator};
pub use retry::RetryPolicy;
pub use service::CampaignService;
pub use structure::{LocalPlatformAdapter, PlatformAdapter, StructureAssembler};
pub use supervisor::{GenerationHandle, GenerationProgress, GenerationSupervisor};
