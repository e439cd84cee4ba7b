//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Outbox Ports
//!
//! - `EventStore` - Pending event queries and transaction factory
//! - `ProvisioningTransaction` - Per-event unit of work

mod event_store;

pub use event_store::{EventStore, ProvisioningTransaction};
