//! Outbox events recorded by upstream write paths.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, EventId, Timestamp};

/// Type tag of the event emitted when an organization is created.
pub const ORGANIZATION_CREATED: &str = "organization.created";

/// An immutable fact waiting in the outbox.
///
/// Only the publication state changes after creation, and it only ever
/// moves from unpublished to published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: EventId,

    /// Identifier of the entity the event concerns
    pub aggregate_id: String,

    /// Discriminator selecting payload schema and handling
    pub event_type: String,

    /// Serialized payload, schema determined by `event_type`
    pub payload: Vec<u8>,

    pub published: bool,

    pub published_at: Option<Timestamp>,

    pub created_at: Timestamp,
}

impl OutboxEvent {
    /// Create a new unpublished event stamped with the current time.
    pub fn new(
        aggregate_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id: EventId::new(),
            aggregate_id: aggregate_id.into(),
            event_type: event_type.into(),
            payload: payload.into(),
            published: false,
            published_at: None,
            created_at: Timestamp::now(),
        }
    }

    /// Override the creation time.
    pub fn with_created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = created_at;
        self
    }

    /// Returns true while the event still awaits processing.
    pub fn is_pending(&self) -> bool {
        !self.published
    }

    /// Record publication. Fails if the event was already published.
    pub fn mark_published(&mut self, at: Timestamp) -> Result<(), DomainError> {
        if self.published {
            return Err(DomainError::new(
                ErrorCode::EventAlreadyPublished,
                format!("Event {} is already published", self.id),
            ));
        }
        self.published = true;
        self.published_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_is_pending() {
        let event = OutboxEvent::new("org-1", ORGANIZATION_CREATED, b"{}".to_vec());

        assert!(event.is_pending());
        assert!(event.published_at.is_none());
    }

    #[test]
    fn mark_published_sets_state_once() {
        let mut event = OutboxEvent::new("org-1", ORGANIZATION_CREATED, b"{}".to_vec());
        let now = Timestamp::now();

        event.mark_published(now).unwrap();

        assert!(!event.is_pending());
        assert_eq!(event.published_at, Some(now));
    }

    #[test]
    fn mark_published_twice_is_rejected() {
        let mut event = OutboxEvent::new("org-1", ORGANIZATION_CREATED, b"{}".to_vec());
        let first = Timestamp::now();
        event.mark_published(first).unwrap();

        let err = event.mark_published(first.plus_secs(10)).unwrap_err();

        assert_eq!(err.code, ErrorCode::EventAlreadyPublished);
        assert_eq!(event.published_at, Some(first));
    }
}
