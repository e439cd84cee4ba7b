//! PostgreSQL implementation of EventStore.
//!
//! Events live in `outbox_events` with a JSONB payload; workspaces live in
//! `billing_workspaces` with a unique constraint on `organization_id`.
//! Each provisioning transaction is a plain `sqlx` transaction at the
//! database's default (read committed) isolation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, EventId, OrganizationId, Timestamp,
};
use crate::domain::provisioning::{BillingWorkspace, OutboxEvent};
use crate::ports::{EventStore, ProvisioningTransaction};

const WORKSPACE_ORGANIZATION_KEY: &str = "billing_workspaces_organization_id_key";

/// PostgreSQL implementation of the EventStore port.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresEventStore")
            .field("pool", &"PgPool")
            .finish()
    }
}

impl PostgresEventStore {
    /// Creates a new PostgresEventStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an outbox event.
#[derive(Debug, sqlx::FromRow)]
struct OutboxEventRow {
    id: Uuid,
    aggregate_id: String,
    event_type: String,
    payload: String,
    published: bool,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<OutboxEventRow> for OutboxEvent {
    fn from(row: OutboxEventRow) -> Self {
        OutboxEvent {
            id: EventId::from_uuid(row.id),
            aggregate_id: row.aggregate_id,
            event_type: row.event_type,
            payload: row.payload.into_bytes(),
            published: row.published,
            published_at: row.published_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn fetch_pending(
        &self,
        event_type: &str,
        limit: u32,
    ) -> Result<Vec<OutboxEvent>, DomainError> {
        let rows: Vec<OutboxEventRow> = sqlx::query_as(
            r#"
            SELECT id, aggregate_id, event_type, payload::text AS payload,
                   published, published_at, created_at
            FROM outbox_events
            WHERE event_type = $1 AND published = FALSE
            ORDER BY created_at ASC, id ASC
            LIMIT $2
            "#,
        )
        .bind(event_type)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to fetch pending events: {}", e))
                .with_detail("event_type", event_type)
        })?;

        Ok(rows.into_iter().map(OutboxEvent::from).collect())
    }

    async fn begin(&self) -> Result<Box<dyn ProvisioningTransaction>, DomainError> {
        let tx = self.pool.begin().await.map_err(|e| {
            DomainError::database(format!("Failed to begin transaction: {}", e))
        })?;

        Ok(Box::new(PostgresProvisioningTransaction { tx }))
    }
}

/// A provisioning unit of work over a single `sqlx` transaction.
///
/// Dropping it without commit rolls back, courtesy of `sqlx::Transaction`.
struct PostgresProvisioningTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ProvisioningTransaction for PostgresProvisioningTransaction {
    async fn workspace_exists(
        &mut self,
        organization_id: &OrganizationId,
    ) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM billing_workspaces WHERE organization_id = $1)",
        )
        .bind(organization_id.as_uuid())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to check workspace: {}", e))
                .with_detail("organization_id", organization_id.to_string())
        })
    }

    async fn create_workspace(&mut self, workspace: &BillingWorkspace) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO billing_workspaces (id, organization_id, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(workspace.id.as_uuid())
        .bind(workspace.organization_id.as_uuid())
        .bind(workspace.created_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            let err = match &e {
                sqlx::Error::Database(db_err)
                    if db_err.constraint() == Some(WORKSPACE_ORGANIZATION_KEY) =>
                {
                    DomainError::new(
                        ErrorCode::WorkspaceExists,
                        "Organization already has a billing workspace",
                    )
                }
                _ => DomainError::database(format!("Failed to insert workspace: {}", e)),
            };
            err.with_detail("organization_id", workspace.organization_id.to_string())
        })?;

        Ok(())
    }

    async fn mark_published(
        &mut self,
        event_id: &EventId,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_events SET
                published = TRUE,
                published_at = $2
            WHERE id = $1 AND published = FALSE
            "#,
        )
        .bind(event_id.as_uuid())
        .bind(at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to mark event published: {}", e))
                .with_detail("event_id", event_id.to_string())
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::EventAlreadyPublished,
                "Event not found or already published",
            )
            .with_detail("event_id", event_id.to_string()));
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx.commit().await.map_err(|e| {
            DomainError::database(format!("Failed to commit transaction: {}", e))
        })
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.tx.rollback().await.map_err(|e| {
            DomainError::database(format!("Failed to roll back transaction: {}", e))
        })
    }
}
