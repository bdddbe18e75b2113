//! Configuration management for alertrelay
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to layer built-in defaults, a YAML file, `ALERTRELAY_` environment
//! variables, and command-line flags.

use crate::cli::Cli;
use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// AWS region hosting the SNS topics.
    pub aws_region: String,
    /// Static access key. Used only together with `aws_secret_key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_access_key: Option<String>,
    /// Static secret key. Used only together with `aws_access_key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_secret_key: Option<String>,
    /// The destinations alerts are fanned out to.
    pub sns_topics: Vec<TopicConfig>,
    /// Alert names that are admitted into the pipeline.
    pub alertnames: Vec<String>,
    /// What to do with alerts when `alertnames` is empty.
    pub empty_allowlist: EmptyAllowListPolicy,
    /// Interval between periodic flushes.
    pub batch_wait_seconds: u64,
    /// Capacity of the intake queue between the HTTP handler and the scheduler.
    pub queue_capacity: usize,
    /// The logging level for the application.
    pub log_level: String,
    /// The format of log lines.
    pub log_format: LogFormat,
    /// Configuration for the inbound HTTP server.
    pub server: ServerConfig,
    /// Configuration for the Prometheus metrics endpoint.
    pub metrics: MetricsConfig,
    /// Timeouts for the HTTP server and the AWS client.
    pub timeouts: TimeoutsConfig,
}

/// A downstream SNS topic and its availability window.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct TopicConfig {
    pub name: String,
    pub arn: String,
    /// Start of the availability window, "HH:MM" in UTC.
    pub start_time: String,
    /// End of the availability window, "HH:MM" in UTC.
    pub end_time: String,
    /// Weekday names the topic is available on. Empty means every day.
    #[serde(default)]
    pub days_of_week: Vec<String>,
}

/// Admission policy applied when the alert name allow-list is empty.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmptyAllowListPolicy {
    /// Fail open: every alert is admitted.
    #[default]
    AdmitAll,
    /// Fail closed: every alert is dropped.
    RejectAll,
}

/// The format for log output.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Json => write!(f, "json"),
            LogFormat::Text => write!(f, "text"),
        }
    }
}

/// Configuration for the inbound HTTP server.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// The address the webhook server listens on.
    pub listen_address: SocketAddr,
}

/// Configuration for the metrics system.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and expose `/metrics`.
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct TimeoutsConfig {
    #[serde(default)]
    pub server: ServerTimeouts,
    #[serde(default)]
    pub aws: AwsTimeouts,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ServerTimeouts {
    /// Upper bound on the graceful HTTP shutdown.
    #[serde(default)]
    pub shutdown_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct AwsTimeouts {
    /// Connection establishment timeout.
    #[serde(default)]
    pub dial_timeout_seconds: u64,
    /// Time to wait for response data once connected.
    #[serde(default)]
    pub read_timeout_seconds: u64,
    /// Deadline for a single SNS API call, including publishes.
    #[serde(default)]
    pub api_call_timeout_seconds: u64,
}

impl AwsTimeouts {
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_seconds)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_seconds)
    }

    pub fn api_call_timeout(&self) -> Duration {
        Duration::from_secs(self.api_call_timeout_seconds)
    }
}

impl Config {
    /// Loads the application configuration.
    ///
    /// Sources are layered in increasing priority: defaults, the YAML file
    /// named by the CLI, `ALERTRELAY_` environment variables (nested keys are
    /// separated by `__`, e.g. `ALERTRELAY_SERVER__LISTEN_ADDRESS`), then
    /// explicit command-line flags.
    pub fn load(cli: &Cli) -> Result<Self> {
        let path = cli.config_path();
        if !path.is_file() {
            bail!("Failed to read config file '{}'", path.display());
        }
        let mut config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(&path))
            .merge(Env::prefixed("ALERTRELAY_").split("__"))
            .merge(cli.clone())
            .extract()
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        config.apply_default_timeouts();
        config.validate()?;
        Ok(config)
    }

    /// Replaces unset (zero) timeouts with their defaults.
    pub fn apply_default_timeouts(&mut self) {
        fn or_default(value: &mut u64, default: u64) {
            if *value == 0 {
                *value = default;
            }
        }
        or_default(&mut self.timeouts.server.shutdown_timeout_seconds, 10);
        or_default(&mut self.timeouts.aws.dial_timeout_seconds, 5);
        or_default(&mut self.timeouts.aws.read_timeout_seconds, 10);
        or_default(&mut self.timeouts.aws.api_call_timeout_seconds, 10);
    }

    /// Rejects configurations the service cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.aws_region.trim().is_empty() {
            bail!("Missing required field in config: aws_region");
        }
        if self.sns_topics.is_empty() {
            bail!("Missing required field in config: sns_topics");
        }
        for topic in &self.sns_topics {
            if topic.arn.trim().is_empty() {
                bail!("SNS topic '{}' has no arn", topic.name);
            }
        }
        if self.batch_wait_seconds == 0 {
            bail!("batch_wait_seconds must be a positive integer");
        }
        if self.queue_capacity == 0 {
            bail!("queue_capacity must be a positive integer");
        }
        Ok(())
    }

    /// Returns the static credentials pair if both halves are configured.
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (self.aws_access_key.as_deref(), self.aws_secret_key.as_deref()) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some((key, secret))
            }
            _ => None,
        }
    }

    pub fn batch_wait(&self) -> Duration {
        Duration::from_secs(self.batch_wait_seconds)
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            aws_region: String::new(),
            aws_access_key: None,
            aws_secret_key: None,
            sns_topics: vec![],
            alertnames: vec![],
            empty_allowlist: EmptyAllowListPolicy::AdmitAll,
            batch_wait_seconds: 60,
            queue_capacity: 100,
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            server: ServerConfig {
                listen_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            },
            metrics: MetricsConfig { enabled: true },
            timeouts: TimeoutsConfig::default(),
        }
    }
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config/config.yaml")
}
