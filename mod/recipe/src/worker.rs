use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::service::RecipeEngine;

/// Configuration for the background checks worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often to scan for PROCESSING recipes (seconds).
    pub poll_interval: u64,
    /// Maximum recipes handled per scan.
    pub batch_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: 5,
            batch_size: 50,
        }
    }
}

/// Start the automated-checks loop.
///
/// Submitted recipes sit in PROCESSING until this worker runs content
/// checks and moves them to PENDING_REVIEW or back to DRAFT. Returns a
/// CancellationToken that stops the loop when cancelled.
pub fn start(engine: Arc<RecipeEngine>, config: WorkerConfig) -> CancellationToken {
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        let interval = Duration::from_secs(config.poll_interval);
        let batch = config.batch_size;

        tokio::spawn(async move {
            info!("recipe checks worker started (interval={interval:?})");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("recipe checks worker stopped");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        debug!("checks worker scan");
                        match engine.process_pending_checks(batch) {
                            Ok(0) => {}
                            Ok(n) => info!("checks worker: moved {n} recipes"),
                            Err(e) => error!("checks worker error: {e}"),
                        }
                    }
                }
            }
        });
    }

    cancel
}
