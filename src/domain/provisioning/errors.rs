//! Provisioning-specific error types.
//!
//! # Retry Semantics
//!
//! | Error | Cause | Retryable |
//! |-------|-------|-----------|
//! | Fetch | store unreachable or query failed | yes |
//! | Decode | payload is not well-formed JSON | no |
//! | Validation | required payload field missing or empty | no |
//! | IdentifierFormat | subject id is not a valid store identifier | no |
//! | ResourceCreation | workspace lookup or insert failed | yes |
//! | MarkPublished | publication update failed | yes |
//! | Transaction | begin or commit failed | yes |
//!
//! Non-retryable errors are still retried on every poll because the event
//! stays unpublished; the flag only drives how loudly they are logged.

use crate::domain::foundation::{ErrorCode, ValidationError};

/// Errors raised while consuming a single outbox event or a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningError {
    /// Pending events could not be fetched.
    Fetch(String),

    /// Payload bytes are not a well-formed JSON object.
    Decode(String),

    /// A required payload field is missing or empty.
    Validation(ValidationError),

    /// The subject identifier could not be parsed.
    IdentifierFormat { value: String, reason: String },

    /// Checking for or creating the billing workspace failed.
    ResourceCreation(String),

    /// Marking the event as published failed.
    MarkPublished(String),

    /// Beginning or committing the transaction failed.
    Transaction(String),
}

impl ProvisioningError {
    pub fn fetch(message: impl Into<String>) -> Self {
        ProvisioningError::Fetch(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        ProvisioningError::Decode(message.into())
    }

    pub fn identifier_format(value: impl Into<String>, reason: impl Into<String>) -> Self {
        ProvisioningError::IdentifierFormat {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn resource_creation(message: impl Into<String>) -> Self {
        ProvisioningError::ResourceCreation(message.into())
    }

    pub fn mark_published(message: impl Into<String>) -> Self {
        ProvisioningError::MarkPublished(message.into())
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        ProvisioningError::Transaction(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ProvisioningError::Fetch(_) => ErrorCode::DatabaseError,
            ProvisioningError::Decode(_) => ErrorCode::PayloadDecodeFailed,
            ProvisioningError::Validation(_) => ErrorCode::ValidationFailed,
            ProvisioningError::IdentifierFormat { .. } => ErrorCode::InvalidIdentifier,
            ProvisioningError::ResourceCreation(_)
            | ProvisioningError::MarkPublished(_)
            | ProvisioningError::Transaction(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a human-readable error message.
    pub fn message(&self) -> String {
        match self {
            ProvisioningError::Fetch(msg) => format!("Failed to fetch pending events: {}", msg),
            ProvisioningError::Decode(msg) => format!("Failed to decode payload: {}", msg),
            ProvisioningError::Validation(err) => format!("Invalid payload: {}", err),
            ProvisioningError::IdentifierFormat { value, reason } => {
                format!("Invalid subject identifier '{}': {}", value, reason)
            }
            ProvisioningError::ResourceCreation(msg) => {
                format!("Failed to provision billing workspace: {}", msg)
            }
            ProvisioningError::MarkPublished(msg) => {
                format!("Failed to mark event published: {}", msg)
            }
            ProvisioningError::Transaction(msg) => format!("Transaction failed: {}", msg),
        }
    }

    /// Returns true if a later attempt can succeed without changing the event.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ProvisioningError::Decode(_)
                | ProvisioningError::Validation(_)
                | ProvisioningError::IdentifierFormat { .. }
        )
    }
}

impl std::fmt::Display for ProvisioningError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ProvisioningError {}

impl From<ValidationError> for ProvisioningError {
    fn from(err: ValidationError) -> Self {
        ProvisioningError::Validation(err)
    }
}
