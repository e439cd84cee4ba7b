//! Provisioning domain - outbox events, payloads, and billing workspaces.
//!
//! An `organization.created` event in the outbox results in exactly one
//! `BillingWorkspace` for that organization, no matter how many times the
//! event is delivered.

mod errors;
mod event;
mod payload;
mod workspace;

pub use errors::ProvisioningError;
pub use event::{OutboxEvent, ORGANIZATION_CREATED};
pub use payload::OrganizationCreatedPayload;
pub use workspace::BillingWorkspace;
