//! Provisioning handlers - Side effects driven by outbox events.

mod provision_workspace;

pub use provision_workspace::{
    ProvisionOutcome, ProvisionWorkspaceCommand, ProvisionWorkspaceHandler,
    ProvisionWorkspaceResult,
};
