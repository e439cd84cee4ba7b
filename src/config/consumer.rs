//! Outbox consumer configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::OutboxConsumerConfig;
use crate::domain::provisioning::ORGANIZATION_CREATED;

/// Outbox consumer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ConsumerConfig {
    /// Event type tag to consume
    #[serde(default = "default_event_type")]
    pub event_type: String,

    /// Poll interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Maximum events per poll
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl ConsumerConfig {
    /// Get poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Build the runtime configuration of the consumer service
    pub fn to_consumer_config(&self) -> OutboxConsumerConfig {
        OutboxConsumerConfig::default()
            .with_event_type(self.event_type.clone())
            .with_poll_interval(self.poll_interval())
            .with_batch_size(self.batch_size)
    }

    /// Validate consumer configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.event_type.trim().is_empty() {
            return Err(ValidationError::MissingRequired("CONSUMER_EVENT_TYPE"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ValidationError::InvalidPollInterval);
        }
        if self.batch_size == 0 {
            return Err(ValidationError::InvalidBatchSize);
        }
        if self.batch_size > 1000 {
            return Err(ValidationError::BatchSizeTooLarge);
        }
        Ok(())
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            event_type: default_event_type(),
            poll_interval_ms: default_poll_interval(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_event_type() -> String {
    ORGANIZATION_CREATED.to_string()
}

fn default_poll_interval() -> u64 {
    5_000
}

fn default_batch_size() -> u32 {
    50
}
