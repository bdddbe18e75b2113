#![allow(dead_code)]
pub mod app;
pub mod mock_publisher;
pub mod test_metrics;

use alertrelay::config::{Config, TopicConfig};
use alertrelay::core::{Alert, Clock};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;

/// A clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Monday 2024-05-06 at the given UTC time.
pub fn monday_at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, hour, minute, 0).unwrap()
}

pub fn alert(name: &str, summary: &str) -> Alert {
    Alert {
        status: "firing".to_string(),
        labels: HashMap::from([("alertname".to_string(), name.to_string())]),
        annotations: HashMap::from([("summary".to_string(), summary.to_string())]),
        ..Default::default()
    }
}

pub fn topic(name: &str, start: &str, end: &str) -> TopicConfig {
    TopicConfig {
        name: name.to_string(),
        arn: format!("arn:aws:sns:us-east-1:123456789012:{}", name),
        start_time: start.to_string(),
        end_time: end.to_string(),
        days_of_week: vec![],
    }
}

/// A configuration that binds an ephemeral port and never installs the
/// global metrics recorder.
pub fn test_config(topics: Vec<TopicConfig>, alertnames: &[&str]) -> Config {
    let mut config = Config {
        aws_region: "us-east-1".to_string(),
        sns_topics: topics,
        alertnames: alertnames.iter().map(|s| s.to_string()).collect(),
        batch_wait_seconds: 3600,
        ..Default::default()
    };
    config.server.listen_address = "127.0.0.1:0".parse().unwrap();
    config.metrics.enabled = false;
    config
}
