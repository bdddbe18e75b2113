#![allow(dead_code)]
//! A mock publisher recording every message it is asked to deliver.

use alertrelay::core::{PublishError, Publisher};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// One recorded publish call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Published {
    pub topic_arn: String,
    pub message: String,
}

#[derive(Clone, Debug, Default)]
pub struct MockPublisher {
    pub published: Arc<Mutex<Vec<Published>>>,
    pub failing_topics: Arc<Mutex<Vec<String>>>,
    pub connection_ok: Arc<Mutex<bool>>,
    notifier: Arc<Notify>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self {
            connection_ok: Arc::new(Mutex::new(true)),
            ..Default::default()
        }
    }

    pub fn fail_topic(&self, topic_arn: &str) {
        self.failing_topics.lock().unwrap().push(topic_arn.to_string());
    }

    pub fn set_connection_ok(&self, ok: bool) {
        *self.connection_ok.lock().unwrap() = ok;
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn published_to(&self, topic_arn: &str) -> Vec<String> {
        self.published()
            .into_iter()
            .filter(|p| p.topic_arn == topic_arn)
            .map(|p| p.message)
            .collect()
    }

    pub async fn wait_for_count(&self, target_count: usize, timeout_duration: Duration) {
        let wait_future = async {
            loop {
                let notified = self.notifier.notified();
                if self.published.lock().unwrap().len() >= target_count {
                    return;
                }
                notified.await;
            }
        };

        tokio::time::timeout(timeout_duration, wait_future)
            .await
            .expect("Timed out waiting for published messages");
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, topic_arn: &str, message: &str) -> Result<(), PublishError> {
        if self.failing_topics.lock().unwrap().iter().any(|t| t == topic_arn) {
            return Err(PublishError::Publish {
                topic_arn: topic_arn.to_string(),
                reason: "mock failure".to_string(),
            });
        }
        self.published.lock().unwrap().push(Published {
            topic_arn: topic_arn.to_string(),
            message: message.to_string(),
        });
        self.notifier.notify_waiters();
        Ok(())
    }

    async fn check_connection(&self) -> Result<(), PublishError> {
        if *self.connection_ok.lock().unwrap() {
            Ok(())
        } else {
            Err(PublishError::Connection("mock transport down".to_string()))
        }
    }
}
