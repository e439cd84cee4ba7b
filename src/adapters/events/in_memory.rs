//! In-memory event store implementation for testing and local runs.
//!
//! Transactions are serialized: `begin` takes an exclusive lock on the store
//! and the transaction records only its own writes, a set of new workspaces
//! and a set of published event ids. `commit` applies them under the same
//! lock; `rollback` or dropping the transaction discards them. This gives the
//! same all-or-nothing behaviour as a database transaction.
//!
//! Faults can be injected per step to exercise rollback and retry paths.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::foundation::{DomainError, ErrorCode, EventId, OrganizationId, Timestamp};
use crate::domain::provisioning::{BillingWorkspace, OutboxEvent};
use crate::ports::{EventStore, ProvisioningTransaction};

#[derive(Debug, Default)]
struct StoreState {
    events: HashMap<EventId, OutboxEvent>,
    workspaces: HashMap<OrganizationId, BillingWorkspace>,
}

#[derive(Debug, Default)]
struct Faults {
    fetch: AtomicBool,
    create_workspace: AtomicBool,
    mark_published: AtomicBool,
    commit: AtomicBool,
}

/// In-memory outbox and workspace store.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(InMemoryEventStore::new());
/// store.insert(OutboxEvent::new(org_id, ORGANIZATION_CREATED, payload)).await;
///
/// let consumer = OutboxConsumer::new(store.clone());
/// consumer.poll_once().await?;
///
/// assert_eq!(store.workspace_count().await, 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    state: Arc<Mutex<StoreState>>,
    faults: Arc<Faults>,
}

impl InMemoryEventStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event to the outbox.
    pub async fn insert(&self, event: OutboxEvent) {
        self.state.lock().await.events.insert(event.id, event);
    }

    // === Test Helpers ===

    /// Returns a snapshot of an event.
    pub async fn event(&self, id: &EventId) -> Option<OutboxEvent> {
        self.state.lock().await.events.get(id).cloned()
    }

    /// Returns the workspace owned by an organization, if any.
    pub async fn workspace_for(&self, organization_id: &OrganizationId) -> Option<BillingWorkspace> {
        self.state
            .lock()
            .await
            .workspaces
            .get(organization_id)
            .cloned()
    }

    /// Returns count of provisioned workspaces.
    pub async fn workspace_count(&self) -> usize {
        self.state.lock().await.workspaces.len()
    }

    /// Returns count of unpublished events across all types.
    pub async fn pending_count(&self) -> usize {
        self.state
            .lock()
            .await
            .events
            .values()
            .filter(|e| e.is_pending())
            .count()
    }

    /// Make `fetch_pending` fail until cleared.
    pub fn fail_fetch(&self, fail: bool) {
        self.faults.fetch.store(fail, Ordering::SeqCst);
    }

    /// Make `create_workspace` fail until cleared.
    pub fn fail_create_workspace(&self, fail: bool) {
        self.faults.create_workspace.store(fail, Ordering::SeqCst);
    }

    /// Make `mark_published` fail until cleared.
    pub fn fail_mark_published(&self, fail: bool) {
        self.faults.mark_published.store(fail, Ordering::SeqCst);
    }

    /// Make `commit` fail until cleared.
    pub fn fail_commit(&self, fail: bool) {
        self.faults.commit.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn fetch_pending(
        &self,
        event_type: &str,
        limit: u32,
    ) -> Result<Vec<OutboxEvent>, DomainError> {
        if self.faults.fetch.load(Ordering::SeqCst) {
            return Err(DomainError::database("Simulated fetch failure"));
        }

        let state = self.state.lock().await;
        let mut pending: Vec<OutboxEvent> = state
            .events
            .values()
            .filter(|e| e.is_pending() && e.event_type == event_type)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        pending.truncate(limit as usize);

        Ok(pending)
    }

    async fn begin(&self) -> Result<Box<dyn ProvisioningTransaction>, DomainError> {
        let guard = self.state.clone().lock_owned().await;

        Ok(Box::new(InMemoryTransaction {
            guard,
            new_workspaces: HashMap::new(),
            published: HashMap::new(),
            faults: self.faults.clone(),
        }))
    }
}

/// Transaction holding the store lock and its uncommitted writes.
struct InMemoryTransaction {
    guard: OwnedMutexGuard<StoreState>,
    new_workspaces: HashMap<OrganizationId, BillingWorkspace>,
    published: HashMap<EventId, Timestamp>,
    faults: Arc<Faults>,
}

impl InMemoryTransaction {
    fn has_workspace(&self, organization_id: &OrganizationId) -> bool {
        self.guard.workspaces.contains_key(organization_id)
            || self.new_workspaces.contains_key(organization_id)
    }
}

#[async_trait]
impl ProvisioningTransaction for InMemoryTransaction {
    async fn workspace_exists(
        &mut self,
        organization_id: &OrganizationId,
    ) -> Result<bool, DomainError> {
        Ok(self.has_workspace(organization_id))
    }

    async fn create_workspace(&mut self, workspace: &BillingWorkspace) -> Result<(), DomainError> {
        if self.faults.create_workspace.load(Ordering::SeqCst) {
            return Err(DomainError::database("Simulated workspace insert failure")
                .with_detail("organization_id", workspace.organization_id.to_string()));
        }
        if self.has_workspace(&workspace.organization_id) {
            return Err(DomainError::new(
                ErrorCode::WorkspaceExists,
                "Organization already has a billing workspace",
            )
            .with_detail("organization_id", workspace.organization_id.to_string()));
        }

        self.new_workspaces
            .insert(workspace.organization_id, workspace.clone());
        Ok(())
    }

    async fn mark_published(
        &mut self,
        event_id: &EventId,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        if self.faults.mark_published.load(Ordering::SeqCst) {
            return Err(DomainError::database("Simulated publish update failure")
                .with_detail("event_id", event_id.to_string()));
        }

        let event = self.guard.events.get(event_id).ok_or_else(|| {
            DomainError::new(ErrorCode::EventNotFound, "Event not found")
                .with_detail("event_id", event_id.to_string())
        })?;
        if !event.is_pending() || self.published.contains_key(event_id) {
            return Err(DomainError::new(
                ErrorCode::EventAlreadyPublished,
                "Event already published",
            )
            .with_detail("event_id", event_id.to_string()));
        }

        self.published.insert(*event_id, at);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        if self.faults.commit.load(Ordering::SeqCst) {
            return Err(DomainError::database("Simulated commit failure"));
        }

        let InMemoryTransaction {
            mut guard,
            new_workspaces,
            published,
            ..
        } = *self;

        // Every id was checked pending under this same lock
        for (event_id, at) in published {
            if let Some(event) = guard.events.get_mut(&event_id) {
                event.mark_published(at)?;
            }
        }
        guard.workspaces.extend(new_workspaces);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        Ok(())
    }
}
