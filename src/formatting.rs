// src/formatting.rs

use crate::core::Alert;
use std::collections::BTreeMap;

/// Alerts of one flush partitioned by alert name. Groups iterate in name
/// order; alerts within a group keep their arrival order.
pub type GroupedAlerts = BTreeMap<String, Vec<Alert>>;

/// Partitions a batch by the `alertname` label.
pub fn group_by_alertname(alerts: Vec<Alert>) -> GroupedAlerts {
    let mut grouped = GroupedAlerts::new();
    for alert in alerts {
        grouped
            .entry(alert.name().to_string())
            .or_default()
            .push(alert);
    }
    grouped
}

/// A trait for rendering one alert group into a single message body.
pub trait MessageFormatter: Send + Sync {
    fn format_group(&self, alertname: &str, alerts: &[Alert]) -> String;
}

/// Plain-text digest: a header with the group name and size, then one bullet
/// per alert summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestFormatter;

impl DigestFormatter {
    fn format_header(&self, alertname: &str, count: usize) -> String {
        let noun = if count == 1 { "alert" } else { "alerts" };
        format!("{} ({} {})", alertname, count, noun)
    }
}

impl MessageFormatter for DigestFormatter {
    fn format_group(&self, alertname: &str, alerts: &[Alert]) -> String {
        let mut message = self.format_header(alertname, alerts.len());
        message.push('\n');
        for summary in alerts.iter().filter_map(Alert::summary) {
            message.push_str("• ");
            message.push_str(summary);
            message.push('\n');
        }
        message
    }
}
