//! The flush scheduler is a stateful actor that accumulates admitted alerts
//! and periodically flushes them through grouping, formatting, and dispatch.

use crate::batch::PendingBatch;
use crate::core::{Alert, Clock};
use crate::dispatch::{DispatchReport, Dispatcher};
use crate::formatting::group_by_alertname;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// The `FlushScheduler` actor. Exactly one runs per process.
pub struct FlushScheduler {
    batch_wait: Duration,
    alert_rx: mpsc::Receiver<Alert>,
    batch: Arc<PendingBatch>,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
}

impl FlushScheduler {
    /// Creates a new `FlushScheduler`.
    pub fn new(
        batch_wait: Duration,
        alert_rx: mpsc::Receiver<Alert>,
        batch: Arc<PendingBatch>,
        dispatcher: Dispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            batch_wait,
            alert_rx,
            batch,
            dispatcher,
            clock,
        }
    }

    /// Runs the scheduler's main loop until shutdown is signalled, then
    /// performs one final flush of whatever has accumulated.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut timer = interval_at(Instant::now() + self.batch_wait, self.batch_wait);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(batch_wait = ?self.batch_wait, "Flush scheduler started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Flush scheduler received shutdown signal, draining pending alerts.");
                    self.flush().await;
                    break;
                }
                Some(alert) = self.alert_rx.recv() => {
                    debug!(alertname = %alert.name(), "Queued alert for next batch");
                    self.batch.append(alert).await;
                }
                _ = timer.tick() => {
                    debug!("Batch timer expired");
                    self.flush().await;
                    timer.reset();
                }
            }
        }
        info!("Flush scheduler finished.");
    }

    /// Drains the pending batch and dispatches it. A no-op when empty.
    pub async fn flush(&self) -> Option<DispatchReport> {
        let alerts = self.batch.drain().await;
        if alerts.is_empty() {
            return None;
        }

        let count = alerts.len();
        let groups = group_by_alertname(alerts);
        debug!(alerts = count, groups = groups.len(), "Flushing batch");

        let report = self.dispatcher.dispatch(&groups, self.clock.now(), None).await;
        info!(
            alerts = count,
            published = report.published,
            failed = report.failed,
            unavailable = report.unavailable,
            misconfigured = report.misconfigured,
            "Batch flushed"
        );
        Some(report)
    }
}
