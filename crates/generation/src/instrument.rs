//! Stage timing for the generation pipeline.

use std::future::Future;
use tokio::time::Instant;
use tracing::debug;

/// Await `fut`, recording its wall time under `generation.stage_latency_ms`.
pub async fn timed<F, T>(stage: &'static str, fut: F) -> T
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let out = fut.await;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1_000.0;
    metrics::histogram!("generation.stage_latency_ms", "stage" => stage).record(elapsed_ms);
    debug!(stage, elapsed_ms, "Stage finished");
    out
}
