//! Fans grouped alerts out to every topic whose window is open.

use crate::availability::TopicWindow;
use crate::config::TopicConfig;
use crate::core::{PublishError, Publisher};
use crate::formatting::{GroupedAlerts, MessageFormatter};
use crate::internal_metrics::Metrics;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

/// Counts of what happened during one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Messages accepted by the publisher.
    pub published: usize,
    /// Messages the publisher rejected or that timed out.
    pub failed: usize,
    /// (group, topic) pairs skipped because the topic was closed.
    pub unavailable: usize,
    /// (group, topic) pairs skipped because the topic window was malformed.
    pub misconfigured: usize,
}

/// Publishes one message per (group, available topic) pair.
pub struct Dispatcher {
    topics: Vec<TopicConfig>,
    publisher: Arc<dyn Publisher>,
    formatter: Box<dyn MessageFormatter>,
    publish_timeout: Duration,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    pub fn new(
        topics: Vec<TopicConfig>,
        publisher: Arc<dyn Publisher>,
        formatter: Box<dyn MessageFormatter>,
        publish_timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            topics,
            publisher,
            formatter,
            publish_timeout,
            metrics,
        }
    }

    /// Dispatches every group to every topic that is available at `now`.
    ///
    /// Each publish is bounded by the configured timeout, or by
    /// `caller_deadline` when that is sooner. Failures are logged and
    /// counted; they never stop the remaining pairs.
    #[instrument(skip_all, fields(groups = groups.len(), topics = self.topics.len()))]
    pub async fn dispatch(
        &self,
        groups: &GroupedAlerts,
        now: DateTime<Utc>,
        caller_deadline: Option<Instant>,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        // Windows are parsed once per dispatch so a bad topic is reported once.
        let windows: Vec<Option<TopicWindow>> = self
            .topics
            .iter()
            .map(|topic| match TopicWindow::from_topic(topic) {
                Ok(window) => Some(window),
                Err(e) => {
                    error!(topic = %topic.name, error = %e, "Skipping topic for this flush");
                    None
                }
            })
            .collect();

        debug!(
            current_time = %now.format("%H:%M"),
            current_day = %now.format("%A"),
            "Evaluating topic availability"
        );

        for (alertname, alerts) in groups {
            let message = self.formatter.format_group(alertname, alerts);

            for (topic, window) in self.topics.iter().zip(&windows) {
                let Some(window) = window else {
                    report.misconfigured += 1;
                    continue;
                };

                if !window.is_available(now) {
                    info!(topic = %topic.name, "Topic is not available at this time");
                    self.metrics.alerts_filtered_total.increment(1);
                    report.unavailable += 1;
                    continue;
                }

                info!(topic = %topic.name, arn = %topic.arn, %alertname, "Sending batch alert");
                match self.publish(&topic.arn, message.clone(), caller_deadline).await {
                    Ok(()) => {
                        self.metrics.alerts_sent_total.increment(alerts.len() as u64);
                        self.metrics.batches_sent_total.increment(1);
                        report.published += 1;
                        info!(arn = %topic.arn, "Batch alert sent to SNS topic");
                    }
                    Err(e) => {
                        self.metrics.alerts_failed_total.increment(alerts.len() as u64);
                        report.failed += 1;
                        error!(arn = %topic.arn, error = %e, "Error sending batch message to SNS");
                    }
                }
            }
        }

        report
    }

    async fn publish(
        &self,
        topic_arn: &str,
        message: String,
        caller_deadline: Option<Instant>,
    ) -> Result<(), PublishError> {
        let start = Instant::now();
        let mut deadline = start + self.publish_timeout;
        if let Some(caller_deadline) = caller_deadline {
            deadline = deadline.min(caller_deadline);
        }

        let result =
            tokio::time::timeout_at(deadline, self.publisher.publish(topic_arn, &message)).await;
        let elapsed = start.elapsed();
        self.metrics.publish_duration_seconds.record(elapsed.as_secs_f64());

        match result {
            Ok(inner) => inner,
            Err(_) => Err(PublishError::Timeout {
                topic_arn: topic_arn.to_string(),
                elapsed,
            }),
        }
    }
}
