use thiserror::Error;

use crate::filter::FilterError;
use crate::store::StoreError;

/// Top-level error taxonomy for the tenancy layer.
///
/// Isolation failures are always surfaced to the caller unmodified - no
/// retries, no degraded execution. Messages never echo tenant identifiers;
/// the entity type and operation are enough for diagnostics.
#[derive(Debug, Error)]
pub enum TenancyError {
    /// Scoped operation attempted with no established tenant context
    #[error("No tenant context established for scoped operation on '{0}'")]
    ContextMissing(String),

    /// Caller-supplied tenant value conflicts with the established context
    #[error("Tenant mismatch rejected for {operation} on '{entity}'")]
    TenantMismatch {
        entity: String,
        operation: &'static str,
    },

    /// Entity type is in neither the scoped nor the explicit-global list
    #[error("Entity type '{0}' is not classified in the scope registry")]
    UnknownEntity(String),

    /// Malformed request rejected before reaching the store
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Passthrough of the underlying store's own failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TenancyError {
    /// HTTP status the outer API layer should map this error to.
    /// Generic codes only - tenancy internals are never exposed to clients.
    pub fn status_code(&self) -> u16 {
        match self {
            TenancyError::ContextMissing(_) => 401,
            TenancyError::TenantMismatch { .. } => 403,
            TenancyError::UnknownEntity(_) => 500,
            TenancyError::InvalidRequest(_) => 400,
            TenancyError::NotFound(_) => 404,
            TenancyError::Filter(_) => 400,
            TenancyError::Store(_) => 500,
        }
    }

    /// Stable error code for client handling and audit logs
    pub fn error_code(&self) -> &'static str {
        match self {
            TenancyError::ContextMissing(_) => "CONTEXT_MISSING",
            TenancyError::TenantMismatch { .. } => "TENANT_MISMATCH",
            TenancyError::UnknownEntity(_) => "UNKNOWN_ENTITY",
            TenancyError::InvalidRequest(_) => "INVALID_REQUEST",
            TenancyError::NotFound(_) => "NOT_FOUND",
            TenancyError::Filter(_) => "INVALID_FILTER",
            TenancyError::Store(_) => "STORE_ERROR",
        }
    }
}
