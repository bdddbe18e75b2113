//! Core domain types and service traits for alertrelay
//!
//! This module defines the webhook data structures received from
//! Alertmanager and the trait contracts that decouple the batching pipeline
//! from the outbound transport and from the wall clock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Label key carrying the alert's name.
pub const ALERTNAME_LABEL: &str = "alertname";
/// Annotation key carrying the human-readable summary.
pub const SUMMARY_ANNOTATION: &str = "summary";

/// The webhook envelope posted by Alertmanager.
///
/// Every field may be missing or `null`; both read as the empty value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct AlertmanagerPayload {
    #[serde(deserialize_with = "null_as_default")]
    pub receiver: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub alerts: Vec<Alert>,
    #[serde(deserialize_with = "null_as_default")]
    pub group_labels: HashMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub common_labels: HashMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub common_annotations: HashMap<String, String>,
    #[serde(rename = "externalURL", deserialize_with = "null_as_default")]
    pub external_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub group_key: String,
}

/// A single alert as received from Alertmanager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Alert {
    /// "firing" or "resolved"
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub labels: HashMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub annotations: HashMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub starts_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ends_at: String,
    #[serde(rename = "generatorURL", deserialize_with = "null_as_default")]
    pub generator_url: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Alert {
    /// Returns the `alertname` label, or an empty string when it is missing.
    pub fn name(&self) -> &str {
        self.labels
            .get(ALERTNAME_LABEL)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Returns the `summary` annotation if present and non-empty.
    pub fn summary(&self) -> Option<&str> {
        self.annotations
            .get(SUMMARY_ANNOTATION)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// Errors produced by a [`Publisher`].
#[derive(Error, Debug, Clone)]
pub enum PublishError {
    #[error("failed to publish message to {topic_arn}: {reason}")]
    Publish { topic_arn: String, reason: String },

    #[error("publish to {topic_arn} timed out after {elapsed:?}")]
    Timeout { topic_arn: String, elapsed: Duration },

    #[error("error checking publisher connection: {0}")]
    Connection(String),

    #[error("topic {name} with ARN {arn} does not exist")]
    TopicNotFound { name: String, arn: String },
}

/// Delivers formatted messages to a downstream pub/sub topic.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes a single message to the topic identified by `topic_arn`.
    ///
    /// # Returns
    /// * `Ok(())` once the transport has accepted the message
    /// * `Err` on any transport or service failure
    async fn publish(&self, topic_arn: &str, message: &str) -> Result<(), PublishError>;

    /// Performs a cheap round-trip to the transport to prove it is reachable.
    async fn check_connection(&self) -> Result<(), PublishError>;
}

/// A source of the current time, injected so window evaluation is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
