//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `provisioning` - Outbox events, payload codec, and billing workspaces

pub mod foundation;
pub mod provisioning;
