//! # Internal Metrics Module
//!
//! This module provides the infrastructure for collecting and exposing
//! pipeline metrics.
//!
//! ## Components:
//!
//! - **`MetricsBuilder`**: Installs the Prometheus recorder once at startup and
//!   hands back the `PrometheusHandle` used to render `/metrics`.
//!
//! - **`Metrics`**: A lightweight, cloneable struct holding handles to every
//!   counter and histogram the pipeline updates. It is passed explicitly into
//!   the intake and the dispatcher.

use crate::config::MetricsConfig;
use anyhow::{Context, Result};
use metrics::{Counter, Histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// The public API for the metrics system.
///
/// This struct holds cloneable handles to the metrics collectors.
#[derive(Clone)]
pub struct Metrics {
    pub alerts_received_total: Counter,
    pub alerts_filtered_total: Counter,
    pub alerts_sent_total: Counter,
    pub alerts_failed_total: Counter,
    pub batches_sent_total: Counter,
    pub publish_duration_seconds: Histogram,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Registers descriptions for all supported metrics with the global
    /// recorder and returns handles to them.
    ///
    /// If no recorder has been installed the handles are no-ops, which is what
    /// unit tests rely on.
    pub fn new() -> Self {
        metrics::describe_counter!("alerts_received_total", Unit::Count, "Total number of alerts received.");
        metrics::describe_counter!("alerts_filtered_total", Unit::Count, "Total number of alerts filtered and not sent.");
        metrics::describe_counter!("alerts_sent_total", Unit::Count, "Total number of alerts sent to SNS.");
        metrics::describe_counter!("alerts_failed_total", Unit::Count, "Total number of alerts that failed to send to SNS.");
        metrics::describe_counter!("batches_sent_total", Unit::Count, "Total number of alert batches sent to SNS.");
        metrics::describe_histogram!("publish_duration_seconds", Unit::Seconds, "Duration of a single publish call to SNS.");

        Self {
            alerts_received_total: metrics::counter!("alerts_received_total"),
            alerts_filtered_total: metrics::counter!("alerts_filtered_total"),
            alerts_sent_total: metrics::counter!("alerts_sent_total"),
            alerts_failed_total: metrics::counter!("alerts_failed_total"),
            batches_sent_total: metrics::counter!("batches_sent_total"),
            publish_duration_seconds: metrics::histogram!("publish_duration_seconds"),
        }
    }
}

/// Builder for the metrics system.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Installs the global Prometheus recorder and returns the `Metrics`
    /// handle together with the handle used to render the exposition format.
    ///
    /// Returns `None` for the render handle when metrics are disabled.
    pub fn build(self) -> Result<(Metrics, Option<PrometheusHandle>)> {
        if !self.config.enabled {
            return Ok((Metrics::new(), None));
        }

        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            )
            .context("Invalid histogram buckets")?
            .build_recorder();
        let handle = recorder.handle();

        metrics::set_global_recorder(recorder)
            .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;
        info!("Prometheus recorder installed");

        // Handles must be created after the recorder is installed.
        Ok((Metrics::new(), Some(handle)))
    }
}
