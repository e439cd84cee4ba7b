//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `events` - Outbox consumer and the in-memory event store
//! - `postgres` - PostgreSQL-backed event store

pub mod events;
pub mod postgres;

pub use events::{BatchReport, EventOutcome, InMemoryEventStore, OutboxConsumer, OutboxConsumerConfig};
pub use postgres::PostgresEventStore;
