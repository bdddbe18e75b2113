//! Alert admission and the intake queue feeding the flush scheduler.

use crate::config::EmptyAllowListPolicy;
use crate::core::Alert;
use crate::internal_metrics::Metrics;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

/// Returns true if `alertname` may enter the pipeline.
///
/// An empty allow-list admits everything; otherwise the name must match an
/// entry exactly (case-sensitive).
pub fn is_alert_admitted(alertname: &str, allowed: &[String]) -> bool {
    allowed.is_empty() || allowed.iter().any(|name| name == alertname)
}

/// The configured set of admitted alert names plus the empty-list policy.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    names: Vec<String>,
    empty_policy: EmptyAllowListPolicy,
}

impl AllowList {
    pub fn new(names: Vec<String>, empty_policy: EmptyAllowListPolicy) -> Self {
        Self {
            names,
            empty_policy,
        }
    }

    pub fn admits(&self, alertname: &str) -> bool {
        if self.names.is_empty() && self.empty_policy == EmptyAllowListPolicy::RejectAll {
            return false;
        }
        is_alert_admitted(alertname, &self.names)
    }
}

/// Outcome of submitting a single alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Filtered,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    #[error("intake queue is closed; the flush scheduler has stopped")]
    Closed,
}

/// Filters incoming alerts and pushes admitted ones onto the bounded intake
/// queue. Cloning is cheap; every request handler holds its own copy.
#[derive(Clone)]
pub struct AlertIntake {
    allow_list: Arc<AllowList>,
    alert_tx: mpsc::Sender<Alert>,
    metrics: Arc<Metrics>,
}

impl AlertIntake {
    pub fn new(allow_list: AllowList, alert_tx: mpsc::Sender<Alert>, metrics: Arc<Metrics>) -> Self {
        Self {
            allow_list: Arc::new(allow_list),
            alert_tx,
            metrics,
        }
    }

    /// Creates an intake together with the receiving end of a queue of the
    /// given capacity.
    pub fn channel(
        allow_list: AllowList,
        capacity: usize,
        metrics: Arc<Metrics>,
    ) -> (Self, mpsc::Receiver<Alert>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(allow_list, tx, metrics), rx)
    }

    /// Admits or drops one alert. Waits while the intake queue is full.
    #[instrument(skip_all, fields(alertname = %alert.name()))]
    pub async fn submit(&self, alert: Alert) -> Result<Admission, IntakeError> {
        self.metrics.alerts_received_total.increment(1);

        if !self.allow_list.admits(alert.name()) {
            info!("Alert is filtered and will not be sent");
            self.metrics.alerts_filtered_total.increment(1);
            return Ok(Admission::Filtered);
        }

        debug!("Alert is allowed");
        self.alert_tx
            .send(alert)
            .await
            .map_err(|_| IntakeError::Closed)?;
        Ok(Admission::Admitted)
    }
}

impl std::fmt::Debug for AlertIntake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertIntake")
            .field("allow_list", &self.allow_list)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn alert_named(name: &str) -> Alert {
        Alert {
            labels: HashMap::from([("alertname".to_string(), name.to_string())]),
            ..Default::default()
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_allow_list_admits_everything() {
        for name in ["DiskFull", "", "anything at all"] {
            assert!(is_alert_admitted(name, &[]));
        }
    }

    #[test]
    fn test_non_empty_allow_list_requires_exact_match() {
        let allowed = names(&["DiskFull", "HighCPU"]);
        assert!(is_alert_admitted("DiskFull", &allowed));
        assert!(is_alert_admitted("HighCPU", &allowed));
        assert!(!is_alert_admitted("diskfull", &allowed));
        assert!(!is_alert_admitted("DiskFul", &allowed));
        assert!(!is_alert_admitted("", &allowed));
    }

    #[test]
    fn test_reject_all_policy_on_empty_list() {
        let list = AllowList::new(vec![], EmptyAllowListPolicy::RejectAll);
        assert!(!list.admits("DiskFull"));

        // The policy only applies when the list is empty.
        let list = AllowList::new(names(&["DiskFull"]), EmptyAllowListPolicy::RejectAll);
        assert!(list.admits("DiskFull"));
    }

    #[tokio::test]
    async fn test_submit_enqueues_admitted_and_drops_filtered() {
        let list = AllowList::new(names(&["DiskFull"]), EmptyAllowListPolicy::AdmitAll);
        let (intake, mut rx) = AlertIntake::channel(list, 10, Arc::new(Metrics::new()));

        assert_eq!(
            intake.submit(alert_named("DiskFull")).await,
            Ok(Admission::Admitted)
        );
        assert_eq!(
            intake.submit(alert_named("HighCPU")).await,
            Ok(Admission::Filtered)
        );

        let queued = rx.recv().await.unwrap();
        assert_eq!(queued.name(), "DiskFull");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_submit_fails_when_queue_closed() {
        let (intake, rx) = AlertIntake::channel(AllowList::default(), 1, Arc::new(Metrics::new()));
        drop(rx);
        assert_eq!(
            intake.submit(alert_named("DiskFull")).await,
            Err(IntakeError::Closed)
        );
    }

    #[tokio::test]
    async fn test_full_queue_blocks_producer_until_drained() {
        let (intake, mut rx) = AlertIntake::channel(AllowList::default(), 1, Arc::new(Metrics::new()));
        intake.submit(alert_named("first")).await.unwrap();

        let producer = {
            let intake = intake.clone();
            tokio::spawn(async move { intake.submit(alert_named("second")).await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!producer.is_finished(), "producer should wait on a full queue");

        assert_eq!(rx.recv().await.unwrap().name(), "first");
        assert_eq!(producer.await.unwrap(), Ok(Admission::Admitted));
        assert_eq!(rx.recv().await.unwrap().name(), "second");
    }
}
