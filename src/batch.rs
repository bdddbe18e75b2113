//! The pending batch of alerts awaiting the next flush.

use crate::core::Alert;
use tokio::sync::Mutex;

/// Alerts accumulated since the last flush.
///
/// The buffer is only ever appended to or drained whole; both happen under
/// the same lock so a flush snapshot never interleaves with an append.
#[derive(Debug, Default)]
pub struct PendingBatch {
    alerts: Mutex<Vec<Alert>>,
}

impl PendingBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, alert: Alert) {
        self.alerts.lock().await.push(alert);
    }

    /// Takes every pending alert, leaving the batch empty.
    pub async fn drain(&self) -> Vec<Alert> {
        std::mem::take(&mut *self.alerts.lock().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(status: &str) -> Alert {
        Alert {
            status: status.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_drain_returns_alerts_in_order_and_resets() {
        let batch = PendingBatch::new();
        batch.append(alert("a")).await;
        batch.append(alert("b")).await;

        let drained = batch.drain().await;
        let statuses: Vec<_> = drained.iter().map(|a| a.status.as_str()).collect();
        assert_eq!(statuses, ["a", "b"]);

        assert!(batch.drain().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_all_kept() {
        let batch = std::sync::Arc::new(PendingBatch::new());
        let handles: Vec<_> = (0..50)
            .map(|i| {
                let batch = batch.clone();
                tokio::spawn(async move { batch.append(alert(&i.to_string())).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(batch.drain().await.len(), 50);
    }
}
