//! EventStore port - Interface for the transactional outbox store.
//!
//! The consumer reads pending events outside of any transaction, then opens
//! one transaction per event in which the billing workspace is provisioned
//! and the event is marked published.
//!
//! ## Pattern Overview
//!
//! 1. Upstream write path stores the organization AND its event in one transaction
//! 2. OutboxConsumer fetches pending events of the monitored type
//! 3. Per event: existence check, workspace insert, publish flag, commit
//! 4. Any failure rolls the whole unit back; the event is retried next poll
//!
//! ## Concurrency
//!
//! Implementations must enforce a uniqueness constraint on the workspace's
//! organization id. The existence check in step 3 is not race-free on its own
//! when several consumers run against the same store.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventId, OrganizationId, Timestamp};
use crate::domain::provisioning::{BillingWorkspace, OutboxEvent};

/// Port for reading pending outbox events and opening provisioning transactions.
///
/// # Example
///
/// ```ignore
/// let events = store.fetch_pending(ORGANIZATION_CREATED, 50).await?;
///
/// for event in events {
///     let mut txn = store.begin().await?;
///     if !txn.workspace_exists(&org_id).await? {
///         txn.create_workspace(&BillingWorkspace::new(org_id, now)).await?;
///     }
///     txn.mark_published(&event.id, now).await?;
///     txn.commit().await?;
/// }
/// ```
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Get unpublished events of a given type.
    ///
    /// Returns at most `limit` events ordered by creation time, oldest first.
    async fn fetch_pending(
        &self,
        event_type: &str,
        limit: u32,
    ) -> Result<Vec<OutboxEvent>, DomainError>;

    /// Open a transaction for provisioning a single event.
    async fn begin(&self) -> Result<Box<dyn ProvisioningTransaction>, DomainError>;
}

/// A unit of work covering one event.
///
/// Dropping a transaction without calling `commit` discards its writes.
#[async_trait]
pub trait ProvisioningTransaction: Send {
    /// Check whether the organization already owns a billing workspace.
    async fn workspace_exists(
        &mut self,
        organization_id: &OrganizationId,
    ) -> Result<bool, DomainError>;

    /// Insert a billing workspace.
    ///
    /// Fails with `WorkspaceExists` if the organization already has one.
    async fn create_workspace(&mut self, workspace: &BillingWorkspace) -> Result<(), DomainError>;

    /// Flag an unpublished event as published at the given instant.
    ///
    /// Fails if the event does not exist or is already published.
    async fn mark_published(&mut self, event_id: &EventId, at: Timestamp)
        -> Result<(), DomainError>;

    /// Make all writes of this transaction durable.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    /// Discard all writes of this transaction.
    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}
