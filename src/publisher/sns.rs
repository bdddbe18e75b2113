//! A publisher backed by AWS SNS.

use crate::config::{Config, TopicConfig};
use crate::core::{PublishError, Publisher};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{timeout::TimeoutConfig, BehaviorVersion, Region};
use aws_sdk_sns::config::Credentials;
use aws_sdk_sns::error::DisplayErrorContext;
use aws_sdk_sns::Client;
use tracing::{debug, info, instrument};

/// Publishes messages to SNS topics.
#[derive(Clone, Debug)]
pub struct SnsPublisher {
    client: Client,
}

impl SnsPublisher {
    /// Builds an SNS client from the configuration and verifies it.
    ///
    /// Verification lists topics to prove the credentials and region work,
    /// then checks that every configured topic exists. Any failure here is
    /// fatal to startup.
    pub async fn connect(config: &Config) -> Result<Self> {
        let timeouts = &config.timeouts.aws;
        let timeout_config = TimeoutConfig::builder()
            .connect_timeout(timeouts.dial_timeout())
            .read_timeout(timeouts.read_timeout())
            .operation_timeout(timeouts.api_call_timeout())
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()))
            .timeout_config(timeout_config);
        if let Some((access_key, secret_key)) = config.static_credentials() {
            debug!("Using static AWS credentials from configuration");
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "alertrelay-config",
            ));
        }
        let shared_config = loader.load().await;

        let publisher = Self::from_client(Client::new(&shared_config));
        publisher
            .check_connection()
            .await
            .context("failed to verify SNS client")?;
        info!(region = %config.aws_region, "AWS SNS client successfully verified");

        publisher
            .verify_topics(&config.sns_topics)
            .await
            .context("SNS topics verification failed")?;
        Ok(publisher)
    }

    /// Wraps an already configured client without verifying it.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Fails if any configured topic does not exist.
    pub async fn verify_topics(&self, topics: &[TopicConfig]) -> Result<(), PublishError> {
        for topic in topics {
            if !self.topic_exists(&topic.arn).await? {
                return Err(PublishError::TopicNotFound {
                    name: topic.name.clone(),
                    arn: topic.arn.clone(),
                });
            }
            info!(topic = %topic.name, arn = %topic.arn, "SNS topic exists");
        }
        Ok(())
    }

    async fn topic_exists(&self, topic_arn: &str) -> Result<bool, PublishError> {
        match self
            .client
            .get_topic_attributes()
            .topic_arn(topic_arn)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let missing = e
                    .as_service_error()
                    .is_some_and(|se| se.is_not_found_exception() || se.is_invalid_parameter_exception());
                if missing {
                    Ok(false)
                } else {
                    Err(PublishError::Connection(format!(
                        "error getting topic attributes for {}: {}",
                        topic_arn,
                        DisplayErrorContext(&e)
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl Publisher for SnsPublisher {
    #[instrument(skip(self, message), fields(bytes = message.len()))]
    async fn publish(&self, topic_arn: &str, message: &str) -> Result<(), PublishError> {
        self.client
            .publish()
            .topic_arn(topic_arn)
            .message(message)
            .send()
            .await
            .map_err(|e| PublishError::Publish {
                topic_arn: topic_arn.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }

    async fn check_connection(&self) -> Result<(), PublishError> {
        self.client
            .list_topics()
            .send()
            .await
            .map_err(|e| PublishError::Connection(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}
