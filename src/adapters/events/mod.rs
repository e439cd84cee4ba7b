//! Outbox adapters.
//!
//! - `InMemoryEventStore` - Transactional in-process store for tests and local runs
//! - `OutboxConsumer` - Background service that provisions from the outbox

mod in_memory;
mod outbox_consumer;

pub use in_memory::InMemoryEventStore;
pub use outbox_consumer::{BatchReport, EventOutcome, OutboxConsumer, OutboxConsumerConfig};
