//! ProvisionWorkspaceHandler - Applies one `organization.created` event.
//!
//! Decodes the payload, then inside a single transaction ensures the
//! organization owns exactly one billing workspace and flags the event as
//! published. Either both writes survive or neither does.

use std::sync::Arc;

use crate::domain::foundation::{EventId, OrganizationId, Timestamp, WorkspaceId};
use crate::domain::provisioning::{
    BillingWorkspace, OrganizationCreatedPayload, OutboxEvent, ProvisioningError,
};
use crate::ports::{EventStore, ProvisioningTransaction};

/// Command to provision the billing workspace for one outbox event.
#[derive(Debug, Clone)]
pub struct ProvisionWorkspaceCommand {
    pub event_id: EventId,
    pub payload: Vec<u8>,
}

impl From<&OutboxEvent> for ProvisionWorkspaceCommand {
    fn from(event: &OutboxEvent) -> Self {
        Self {
            event_id: event.id,
            payload: event.payload.clone(),
        }
    }
}

/// What the transaction did for the organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// A new workspace was created.
    Created(WorkspaceId),
    /// The organization already had a workspace; only the event was published.
    AlreadyProvisioned,
}

/// Result of successfully applying an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionWorkspaceResult {
    pub organization_id: OrganizationId,
    pub outcome: ProvisionOutcome,
}

/// Handler that provisions billing workspaces idempotently.
pub struct ProvisionWorkspaceHandler {
    store: Arc<dyn EventStore>,
}

impl ProvisionWorkspaceHandler {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        cmd: ProvisionWorkspaceCommand,
    ) -> Result<ProvisionWorkspaceResult, ProvisioningError> {
        // 1. Decode and validate the payload before touching the store
        let payload = OrganizationCreatedPayload::decode(&cmd.payload)?;
        let organization_id = payload.organization_id()?;

        // 2. Open the per-event unit of work
        let now = Timestamp::now();
        let mut txn = self
            .store
            .begin()
            .await
            .map_err(|e| ProvisioningError::transaction(e.to_string()))?;

        // 3. Apply; roll back everything on any failure
        let outcome = match apply(&mut *txn, &cmd.event_id, organization_id, now).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::warn!(
                        event_id = %cmd.event_id,
                        error = %rollback_err,
                        "Rollback failed after provisioning error"
                    );
                }
                return Err(err);
            }
        };

        // 4. Commit
        txn.commit()
            .await
            .map_err(|e| ProvisioningError::transaction(e.to_string()))?;

        match outcome {
            ProvisionOutcome::Created(workspace_id) => tracing::info!(
                event_id = %cmd.event_id,
                organization_id = %organization_id,
                workspace_id = %workspace_id,
                country_code = %payload.country_code,
                default_currency = %payload.default_currency,
                "Provisioned billing workspace"
            ),
            ProvisionOutcome::AlreadyProvisioned => tracing::debug!(
                event_id = %cmd.event_id,
                organization_id = %organization_id,
                "Billing workspace already exists, marking event published"
            ),
        }

        Ok(ProvisionWorkspaceResult {
            organization_id,
            outcome,
        })
    }
}

async fn apply(
    txn: &mut dyn ProvisioningTransaction,
    event_id: &EventId,
    organization_id: OrganizationId,
    now: Timestamp,
) -> Result<ProvisionOutcome, ProvisioningError> {
    let exists = txn
        .workspace_exists(&organization_id)
        .await
        .map_err(|e| ProvisioningError::resource_creation(e.to_string()))?;

    let outcome = if exists {
        ProvisionOutcome::AlreadyProvisioned
    } else {
        let workspace = BillingWorkspace::new(organization_id, now);
        txn.create_workspace(&workspace)
            .await
            .map_err(|e| ProvisioningError::resource_creation(e.to_string()))?;
        ProvisionOutcome::Created(workspace.id)
    };

    txn.mark_published(event_id, now)
        .await
        .map_err(|e| ProvisioningError::mark_published(e.to_string()))?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryEventStore;
    use crate::domain::provisioning::ORGANIZATION_CREATED;
    use serde_json::json;

    fn org_event(organization_id: &str) -> OutboxEvent {
        let payload = serde_json::to_vec(&json!({
            "organization_id": organization_id,
            "owner_id": "owner-1",
            "country_code": "SE",
            "timezone": "Europe/Stockholm",
            "default_currency": "SEK",
            "created_at": "2024-05-01T12:00:00Z"
        }))
        .unwrap();
        OutboxEvent::new(organization_id, ORGANIZATION_CREATED, payload)
    }

    async fn setup(event: &OutboxEvent) -> (Arc<InMemoryEventStore>, ProvisionWorkspaceHandler) {
        let store = Arc::new(InMemoryEventStore::new());
        store.insert(event.clone()).await;
        let handler = ProvisionWorkspaceHandler::new(store.clone());
        (store, handler)
    }

    #[tokio::test]
    async fn creates_workspace_and_publishes_event() {
        let org = OrganizationId::new();
        let event = org_event(&org.to_string());
        let (store, handler) = setup(&event).await;

        let result = handler.handle((&event).into()).await.unwrap();

        let workspace = store.workspace_for(&org).await.unwrap();
        let stored = store.event(&event.id).await.unwrap();
        assert_eq!(result.organization_id, org);
        assert_eq!(result.outcome, ProvisionOutcome::Created(workspace.id));
        assert!(stored.published);
        assert_eq!(stored.published_at, Some(workspace.created_at));
    }

    #[tokio::test]
    async fn existing_workspace_is_not_duplicated() {
        let org = OrganizationId::new();
        let first = org_event(&org.to_string());
        let second = org_event(&org.to_string());
        let (store, handler) = setup(&first).await;
        store.insert(second.clone()).await;

        handler.handle((&first).into()).await.unwrap();
        let result = handler.handle((&second).into()).await.unwrap();

        assert_eq!(result.outcome, ProvisionOutcome::AlreadyProvisioned);
        assert_eq!(store.workspace_count().await, 1);
        assert!(!store.event(&second.id).await.unwrap().is_pending());
    }

    #[tokio::test]
    async fn redelivery_of_published_event_fails_without_side_effects() {
        let org = OrganizationId::new();
        let event = org_event(&org.to_string());
        let (store, handler) = setup(&event).await;

        handler.handle((&event).into()).await.unwrap();
        let err = handler.handle((&event).into()).await.unwrap_err();

        assert!(matches!(err, ProvisioningError::MarkPublished(_)));
        assert_eq!(store.workspace_count().await, 1);
    }

    #[tokio::test]
    async fn mark_published_failure_rolls_back_workspace() {
        let org = OrganizationId::new();
        let event = org_event(&org.to_string());
        let (store, handler) = setup(&event).await;
        store.fail_mark_published(true);

        let err = handler.handle((&event).into()).await.unwrap_err();

        assert!(matches!(err, ProvisioningError::MarkPublished(_)));
        assert!(err.to_string().contains(&format!("event_id={}", event.id)));
        assert!(store.workspace_for(&org).await.is_none());
        assert!(store.event(&event.id).await.unwrap().is_pending());
    }

    #[tokio::test]
    async fn create_failure_maps_to_resource_creation() {
        let org = OrganizationId::new();
        let event = org_event(&org.to_string());
        let (store, handler) = setup(&event).await;
        store.fail_create_workspace(true);

        let err = handler.handle((&event).into()).await.unwrap_err();

        assert!(matches!(err, ProvisioningError::ResourceCreation(_)));
        assert!(store.event(&event.id).await.unwrap().is_pending());
    }

    #[tokio::test]
    async fn commit_failure_leaves_nothing_behind() {
        let org = OrganizationId::new();
        let event = org_event(&org.to_string());
        let (store, handler) = setup(&event).await;
        store.fail_commit(true);

        let err = handler.handle((&event).into()).await.unwrap_err();

        assert!(matches!(err, ProvisioningError::Transaction(_)));
        assert_eq!(store.workspace_count().await, 0);
        assert_eq!(store.pending_count().await, 1);
    }

    #[tokio::test]
    async fn invalid_subject_never_opens_transaction() {
        let event = org_event("org_A");
        let (store, handler) = setup(&event).await;
        store.fail_commit(true);

        let err = handler.handle((&event).into()).await.unwrap_err();

        assert!(matches!(err, ProvisioningError::IdentifierFormat { .. }));
        assert_eq!(store.pending_count().await, 1);
    }
}
