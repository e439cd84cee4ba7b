//! Billing workspace, the resource provisioned once per organization.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OrganizationId, Timestamp, WorkspaceId};

/// A billing workspace owned by exactly one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingWorkspace {
    pub id: WorkspaceId,
    pub organization_id: OrganizationId,
    pub created_at: Timestamp,
}

impl BillingWorkspace {
    /// Create a workspace for an organization with a fresh identifier.
    pub fn new(organization_id: OrganizationId, created_at: Timestamp) -> Self {
        Self {
            id: WorkspaceId::new(),
            organization_id,
            created_at,
        }
    }
}
