use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, info};

use crate::metrics::{RATE_LIMIT_STORE_SIZE, RATE_LIMIT_SWEPT};
use crate::rate_limit::RateLimiter;

/// Background task evicting expired rate limit entries. First pass runs one
/// `period` after start; dropping the handle aborts it.
pub struct Sweeper {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Sweeper {
    pub fn start(limiter: Arc<RateLimiter>, period: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            info!(?period, "Rate limit sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = limiter.sweep();
                        RATE_LIMIT_SWEPT.inc_by(removed as f64);
                        RATE_LIMIT_STORE_SIZE.set(limiter.len() as f64);
                        debug!(removed, remaining = limiter.len(), "Rate limit sweep completed");
                    }
                    _ = &mut shutdown_rx => break,
                }
            }

            info!("Rate limit sweeper stopped");
        });

        Self {
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    // Signal the task and wait for it to exit
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
