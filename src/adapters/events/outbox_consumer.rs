//! OutboxConsumer - Background service that provisions from the outbox.
//!
//! This service implements the consuming half of the Transactional Outbox Pattern:
//! 1. Upstream write paths record `organization.created` in the outbox
//! 2. **OutboxConsumer polls the outbox and provisions billing workspaces** ← This module
//!
//! ## Delivery Guarantees
//!
//! - At-least-once: an event stays unpublished until its transaction commits
//! - Exactly-once effect: the workspace insert is guarded by an existence check
//!   and a storage uniqueness constraint
//! - Failure isolation: one bad event never blocks the rest of the batch
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `event_type` | `organization.created` | Type tag to consume |
//! | `poll_interval` | 5s | How often to check for unpublished events |
//! | `batch_size` | 50 | Max events to process per poll cycle |
//!
//! ## Graceful Shutdown
//!
//! The service listens for a shutdown signal and processes one final batch
//! before stopping. Polls never overlap: a tick that fires while a batch is
//! still running is delayed, not queued.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::application::{ProvisionWorkspaceHandler, ProvisionWorkspaceResult};
use crate::domain::foundation::EventId;
use crate::domain::provisioning::{ProvisioningError, ORGANIZATION_CREATED};
use crate::ports::EventStore;

/// Configuration for the OutboxConsumer service.
#[derive(Debug, Clone)]
pub struct OutboxConsumerConfig {
    /// Type tag of the events to consume.
    pub event_type: String,

    /// How often to poll for unpublished events.
    pub poll_interval: Duration,

    /// Maximum events to process per poll cycle.
    pub batch_size: u32,
}

impl Default for OutboxConsumerConfig {
    fn default() -> Self {
        Self {
            event_type: ORGANIZATION_CREATED.to_string(),
            poll_interval: Duration::from_secs(5),
            batch_size: 50,
        }
    }
}

impl OutboxConsumerConfig {
    /// Create config with a custom event type.
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    /// Create config with custom poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Create config with custom batch size.
    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }
}

/// Outcome of processing a single event within a batch.
#[derive(Debug, Clone)]
pub struct EventOutcome {
    pub event_id: EventId,
    pub result: Result<ProvisionWorkspaceResult, ProvisioningError>,
}

/// Per-event outcomes of one poll cycle, in processing order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<EventOutcome>,
}

impl BatchReport {
    /// Number of events fetched in this cycle.
    pub fn fetched(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of events that were provisioned and published.
    pub fn published(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Events that failed and remain unpublished.
    pub fn failures(&self) -> impl Iterator<Item = (&EventId, &ProvisioningError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.event_id, e)))
    }

    /// Number of events that failed.
    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    /// Look up the outcome for a specific event.
    pub fn outcome(&self, event_id: &EventId) -> Option<&EventOutcome> {
        self.outcomes.iter().find(|o| &o.event_id == event_id)
    }
}

/// Background service that consumes the outbox.
///
/// Fetches pending events of one type and applies each through the
/// `ProvisionWorkspaceHandler`, one transaction per event.
pub struct OutboxConsumer {
    store: Arc<dyn EventStore>,
    handler: ProvisionWorkspaceHandler,
    config: OutboxConsumerConfig,
}

impl OutboxConsumer {
    /// Create a new OutboxConsumer with default configuration.
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self::with_config(store, OutboxConsumerConfig::default())
    }

    /// Create a new OutboxConsumer with custom configuration.
    pub fn with_config(store: Arc<dyn EventStore>, config: OutboxConsumerConfig) -> Self {
        Self {
            handler: ProvisionWorkspaceHandler::new(store.clone()),
            store,
            config,
        }
    }

    /// Run the consumer loop until shutdown signal is received.
    ///
    /// A failed fetch is logged and the loop carries on at the next tick.
    /// Dropping the sender side of `shutdown` counts as a shutdown request.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.poll_interval.max(Duration::from_millis(1));
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            event_type = %self.config.event_type,
            poll_interval_ms = period.as_millis() as u64,
            batch_size = self.config.batch_size,
            "Outbox consumer started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                _ = interval.tick() => {
                    self.poll_and_log().await;
                }
            }
        }

        // Shutdown requested - process one final batch then exit
        self.poll_and_log().await;
        tracing::info!(event_type = %self.config.event_type, "Outbox consumer stopped");
    }

    /// Fetch and process a single batch of pending events.
    ///
    /// Per-event failures are reported in the returned `BatchReport` and
    /// never abort the batch. Only a failed fetch returns `Err`.
    pub async fn process_pending(&self) -> Result<BatchReport, ProvisioningError> {
        let events = self
            .store
            .fetch_pending(&self.config.event_type, self.config.batch_size)
            .await
            .map_err(|e| ProvisioningError::fetch(e.to_string()))?;

        let mut report = BatchReport {
            outcomes: Vec::with_capacity(events.len()),
        };

        for event in &events {
            let result = self.handler.handle(event.into()).await;

            if let Err(err) = &result {
                if err.is_retryable() {
                    tracing::error!(event_id = %event.id, code = %err.code(), error = %err, "Failed to process outbox event");
                } else {
                    tracing::warn!(event_id = %event.id, code = %err.code(), error = %err, "Rejected malformed outbox event");
                }
            }

            report.outcomes.push(EventOutcome {
                event_id: event.id,
                result,
            });
        }

        Ok(report)
    }

    /// Run exactly one poll cycle (for testing).
    pub async fn poll_once(&self) -> Result<BatchReport, ProvisioningError> {
        self.process_pending().await
    }

    async fn poll_and_log(&self) {
        match self.process_pending().await {
            Ok(report) if report.fetched() == 0 => {
                tracing::trace!("No pending outbox events");
            }
            Ok(report) => {
                tracing::info!(
                    fetched = report.fetched(),
                    published = report.published(),
                    failed = report.failed(),
                    "Processed outbox batch"
                );
            }
            Err(err) => {
                tracing::error!(error = %err, "Outbox poll failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryEventStore;
    use crate::domain::foundation::{OrganizationId, Timestamp};
    use crate::domain::provisioning::OutboxEvent;
    use serde_json::json;

    fn org_event(org: &OrganizationId) -> OutboxEvent {
        let payload = serde_json::to_vec(&json!({ "organization_id": org.to_string() })).unwrap();
        OutboxEvent::new(org.to_string(), ORGANIZATION_CREATED, payload)
    }

    #[tokio::test]
    async fn poll_once_provisions_pending_events() {
        let store = Arc::new(InMemoryEventStore::new());
        store.insert(org_event(&OrganizationId::new())).await;
        store.insert(org_event(&OrganizationId::new())).await;

        let consumer = OutboxConsumer::new(store.clone());
        let report = consumer.poll_once().await.unwrap();

        assert_eq!(report.fetched(), 2);
        assert_eq!(report.published(), 2);
        assert_eq!(store.workspace_count().await, 2);
        assert_eq!(store.pending_count().await, 0);
    }

    #[tokio::test]
    async fn poll_once_respects_batch_size() {
        let store = Arc::new(InMemoryEventStore::new());
        let base = Timestamp::now();
        for i in 0..5 {
            store
                .insert(org_event(&OrganizationId::new()).with_created_at(base.plus_secs(i)))
                .await;
        }

        let config = OutboxConsumerConfig::default().with_batch_size(2);
        let consumer = OutboxConsumer::with_config(store.clone(), config);

        assert_eq!(consumer.poll_once().await.unwrap().published(), 2);
        assert_eq!(consumer.poll_once().await.unwrap().published(), 2);
        assert_eq!(consumer.poll_once().await.unwrap().published(), 1);
        assert_eq!(consumer.poll_once().await.unwrap().fetched(), 0);
    }

    #[tokio::test]
    async fn poll_once_with_no_pending_returns_empty_report() {
        let store = Arc::new(InMemoryEventStore::new());
        let consumer = OutboxConsumer::new(store);

        let report = consumer.poll_once().await.unwrap();

        assert_eq!(report.fetched(), 0);
    }

    #[tokio::test]
    async fn fetch_failure_is_returned_as_error() {
        let store = Arc::new(InMemoryEventStore::new());
        store.fail_fetch(true);
        let consumer = OutboxConsumer::new(store);

        let err = consumer.poll_once().await.unwrap_err();

        assert!(matches!(err, ProvisioningError::Fetch(_)));
    }

    #[tokio::test]
    async fn other_event_types_are_ignored() {
        let store = Arc::new(InMemoryEventStore::new());
        store
            .insert(OutboxEvent::new("org", "organization.deleted", b"{}".to_vec()))
            .await;
        let consumer = OutboxConsumer::new(store.clone());

        let report = consumer.poll_once().await.unwrap();

        assert_eq!(report.fetched(), 0);
        assert_eq!(store.pending_count().await, 1);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let store = Arc::new(InMemoryEventStore::new());
        store.insert(org_event(&OrganizationId::new())).await;

        let config = OutboxConsumerConfig::default().with_poll_interval(Duration::from_millis(10));
        let consumer = OutboxConsumer::with_config(store.clone(), config);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { consumer.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        handle.await.unwrap();
        assert_eq!(store.workspace_count().await, 1);
    }

    #[tokio::test]
    async fn run_drains_final_batch_on_shutdown() {
        let store = Arc::new(InMemoryEventStore::new());
        let config = OutboxConsumerConfig::default().with_poll_interval(Duration::from_secs(3600));
        let consumer = OutboxConsumer::with_config(store.clone(), config);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { consumer.run(shutdown_rx).await });

        // First tick fires immediately on an empty store; the next is an hour away
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.insert(org_event(&OrganizationId::new())).await;
        shutdown_tx.send(true).unwrap();

        handle.await.unwrap();
        assert_eq!(store.pending_count().await, 0);
    }

    #[tokio::test]
    async fn run_survives_fetch_failures() {
        let store = Arc::new(InMemoryEventStore::new());
        store.insert(org_event(&OrganizationId::new())).await;
        store.fail_fetch(true);

        let config = OutboxConsumerConfig::default().with_poll_interval(Duration::from_millis(10));
        let consumer = OutboxConsumer::with_config(store.clone(), config);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { consumer.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(40)).await;
        store.fail_fetch(false);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.workspace_count().await, 1);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[test]
    fn config_defaults_match_service_contract() {
        let config = OutboxConsumerConfig::default();

        assert_eq!(config.event_type, "organization.created");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.batch_size, 50);
    }
}
