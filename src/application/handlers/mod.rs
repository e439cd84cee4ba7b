//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod provisioning;

pub use provisioning::{
    ProvisionOutcome, ProvisionWorkspaceCommand, ProvisionWorkspaceHandler,
    ProvisionWorkspaceResult,
};
