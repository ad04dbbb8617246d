//! Deadline supervision and progress reporting for generation runs.
//!
//! The supervisor races the orchestrator against the deadline measured from
//! acceptance. Progress is published on a `watch` channel and never reaches
//! 100% before the campaign record is committed. On timeout or failure the
//! run's writes are rolled back and a `FAILED` record is written.

use crate::orchestrator::{GenerationContext, GenerationOrchestrator};
use campaign_core::config::GenerationConfig;
use campaign_core::types::{Campaign, GenerationRequest, ProcessingStatus};
use campaign_core::{CampaignError, CampaignResult, ErrorCode};
use campaign_store::CampaignRepository;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationProgress {
    pub campaign_id: Uuid,
    pub status: ProcessingStatus,
    pub percent: u8,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
}

impl GenerationProgress {
    fn queued(campaign_id: Uuid) -> Self {
        Self {
            campaign_id,
            status: ProcessingStatus::Queued,
            percent: 0,
            elapsed_ms: 0,
            error: None,
        }
    }
}

/// Share of the deadline consumed, capped at 99 while work is outstanding.
pub fn progress_percent(elapsed: Duration, deadline: Duration) -> u8 {
    if deadline.is_zero() {
        return 99;
    }
    let pct = elapsed.as_secs_f64() / deadline.as_secs_f64() * 100.0;
    pct.clamp(0.0, 99.0) as u8
}

/// A spawned generation run.
pub struct GenerationHandle {
    campaign_id: Uuid,
    progress: watch::Receiver<GenerationProgress>,
    task: JoinHandle<CampaignResult<Campaign>>,
}

impl GenerationHandle {
    pub fn campaign_id(&self) -> Uuid {
        self.campaign_id
    }

    /// Latest published progress.
    pub fn progress(&self) -> GenerationProgress {
        self.progress.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationProgress> {
        self.progress.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> CampaignResult<Campaign> {
        self.task
            .await
            .map_err(|e| CampaignError::System(format!("generation task aborted: {e}")))?
    }
}

pub struct GenerationSupervisor {
    orchestrator: Arc<GenerationOrchestrator>,
    repository: Arc<dyn CampaignRepository>,
    deadline: Duration,
    progress_interval: Duration,
    failure_record_timeout: Duration,
}

impl GenerationSupervisor {
    pub fn new(
        orchestrator: Arc<GenerationOrchestrator>,
        repository: Arc<dyn CampaignRepository>,
        config: &GenerationConfig,
    ) -> Self {
        Self {
            orchestrator,
            repository,
            deadline: config.deadline(),
            progress_interval: config.progress_interval(),
            failure_record_timeout: config.failure_record_timeout(),
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Accept a request and run it in the background.
    pub fn spawn(self: &Arc<Self>, request: GenerationRequest) -> GenerationHandle {
        let campaign_id = Uuid::new_v4();
        let accepted = Instant::now();
        let (tx, rx) = watch::channel(GenerationProgress::queued(campaign_id));
        let this = Arc::clone(self);
        let task = tokio::spawn(async move { this.supervise(campaign_id, accepted, request, tx).await });
        info!(campaign_id = %campaign_id, "Generation accepted");
        GenerationHandle {
            campaign_id,
            progress: rx,
            task,
        }
    }

    /// Accept a request and wait for its outcome. The run is owned by its own
    /// task, so a caller that stops waiting still gets a committed or
    /// rolled-back campaign.
    pub async fn generate(self: &Arc<Self>, request: GenerationRequest) -> CampaignResult<Campaign> {
        self.spawn(request).wait().await
    }

    async fn supervise(
        &self,
        campaign_id: Uuid,
        accepted: Instant,
        request: GenerationRequest,
        progress: watch::Sender<GenerationProgress>,
    ) -> CampaignResult<Campaign> {
        let ctx = GenerationContext::new(campaign_id, Utc::now(), accepted + self.deadline);
        let publish = |status: ProcessingStatus, percent: u8, error: Option<ErrorCode>| {
            progress.send_replace(GenerationProgress {
                campaign_id,
                status,
                percent,
                elapsed_ms: accepted.elapsed().as_millis() as u64,
                error,
            });
        };
        publish(
            ProcessingStatus::Processing,
            progress_percent(accepted.elapsed(), self.deadline),
            None,
        );

        let mut work = Box::pin(self.orchestrator.execute(&ctx, &request));
        let mut ticker = tokio::time::interval_at(accepted + self.progress_interval, self.progress_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let outcome = loop {
            tokio::select! {
                biased;
                result = &mut work => break result,
                _ = tokio::time::sleep_until(ctx.deadline) => {
                    break Err(CampaignError::GenerationTimeout {
                        deadline_ms: self.deadline.as_millis() as u64,
                    });
                }
                _ = ticker.tick() => {
                    publish(ProcessingStatus::Processing, progress_percent(accepted.elapsed(), self.deadline), None);
                }
            }
        };
        // Abandon any in-flight stage before undoing its writes.
        drop(work);

        let elapsed_ms = accepted.elapsed().as_millis() as u64;
        match outcome {
            Ok(campaign) => {
                metrics::counter!("generation.completed").increment(1);
                metrics::histogram!("generation.total_ms").record(elapsed_ms as f64);
                publish(ProcessingStatus::Completed, 100, None);
                info!(campaign_id = %campaign_id, elapsed_ms, "Generation completed");
                Ok(campaign)
            }
            Err(err) => {
                if matches!(err, CampaignError::GenerationTimeout { .. }) {
                    metrics::counter!("generation.timeouts").increment(1);
                    warn!(campaign_id = %campaign_id, elapsed_ms, "Generation exceeded its deadline");
                } else {
                    metrics::counter!("generation.failed", "code" => err.code().as_str()).increment(1);
                    warn!(campaign_id = %campaign_id, elapsed_ms, error = %err, "Generation failed");
                }
                self.record_failure(&ctx, &request, &err).await;
                publish(
                    ProcessingStatus::Failed,
                    progress_percent(accepted.elapsed(), self.deadline),
                    Some(err.code()),
                );
                Err(err)
            }
        }
    }

    /// Roll back the run's writes and store the terminal `FAILED` record,
    /// bounded by `failure_record_timeout`.
    async fn record_failure(&self, ctx: &GenerationContext, request: &GenerationRequest, err: &CampaignError) {
        let mut failed = Campaign::queued(ctx.campaign_id, request, ctx.accepted_at);
        failed.mark_failed(err);

        let cleanup = async {
            ctx.journal.rollback(self.repository.as_ref()).await;
            // Overwrites a campaign record the run may already have written.
            self.repository.create_campaign(&failed).await
        };
        match tokio::time::timeout(self.failure_record_timeout, cleanup).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(campaign_id = %ctx.campaign_id, error = %e, "Could not store failed campaign record")
            }
            Err(_) => error!(
                campaign_id = %ctx.campaign_id,
                timeout_ms = self.failure_record_timeout.as_millis() as u64,
                "Timed out storing failed campaign record"
            ),
        }
    }
}
