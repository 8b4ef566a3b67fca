use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// A running refresh loop. Dropping or cancelling the handle stops the loop at its next
/// suspension point, so a cancelled loop can never apply another result.
#[derive(Debug)]
pub struct PollHandle {
    label: String,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Spawns a loop that calls `tick` every `period`. The first call happens one full period
    /// after spawning; callers load immediately on their own. Returning `false` from `tick`
    /// ends the loop.
    pub fn spawn<F, Fut>(label: impl Into<String>, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let label = label.into();
        let task_label = label.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            // No catch-up bursts after a slow round trip.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if !tick().await {
                    debug!("Poll loop {} finished: owner is gone", task_label);
                    break;
                }
            }
        });

        debug!("Started poll loop {} every {:?}", label, period);
        Self { label, task }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn cancel(self) {
        // Drop aborts the task.
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if !self.task.is_finished() {
            debug!("Stopping poll loop {}", self.label);
        }
        self.task.abort();
    }
}
