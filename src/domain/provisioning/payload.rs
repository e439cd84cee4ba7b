//! Payload codec for `organization.created` events.
//!
//! The serialized form is a JSON object whose fields are all strings:
//!
//! ```json
//! {
//!   "organization_id": "550e8400-e29b-41d4-a716-446655440000",
//!   "owner_id": "...",
//!   "country_code": "US",
//!   "timezone": "America/Chicago",
//!   "default_currency": "USD",
//!   "created_at": "2024-05-01T12:00:00Z"
//! }
//! ```
//!
//! Only `organization_id` is required. The remaining fields are provisioning
//! context and pass through untouched, empty when absent.

use serde::{Deserialize, Serialize};

use super::ProvisioningError;
use crate::domain::foundation::{OrganizationId, ValidationError};

/// Wire shape; every field may be absent or null.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPayload {
    organization_id: Option<String>,
    owner_id: Option<String>,
    country_code: Option<String>,
    timezone: Option<String>,
    default_currency: Option<String>,
    created_at: Option<String>,
}

/// Decoded payload of an `organization.created` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationCreatedPayload {
    pub organization_id: String,
    pub owner_id: String,
    pub country_code: String,
    pub timezone: String,
    pub default_currency: String,
    pub created_at: String,
}

impl OrganizationCreatedPayload {
    /// Decode and validate raw payload bytes.
    ///
    /// # Errors
    ///
    /// - `Decode` if the bytes are not a well-formed JSON object
    /// - `Validation` if `organization_id` is missing or blank
    pub fn decode(bytes: &[u8]) -> Result<Self, ProvisioningError> {
        let raw: RawPayload =
            serde_json::from_slice(bytes).map_err(|e| ProvisioningError::decode(e.to_string()))?;

        let organization_id = raw
            .organization_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ValidationError::empty_field("organization_id"))?;

        Ok(Self {
            organization_id,
            owner_id: raw.owner_id.unwrap_or_default(),
            country_code: raw.country_code.unwrap_or_default(),
            timezone: raw.timezone.unwrap_or_default(),
            default_currency: raw.default_currency.unwrap_or_default(),
            created_at: raw.created_at.unwrap_or_default(),
        })
    }

    /// Parse the subject identifier into the store's identifier type.
    pub fn organization_id(&self) -> Result<OrganizationId, ProvisioningError> {
        self.organization_id
            .parse::<OrganizationId>()
            .map_err(|e| ProvisioningError::identifier_format(&self.organization_id, e.to_string()))
    }
}
