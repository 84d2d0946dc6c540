pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::filter::{FilterData, FilterError};

/// Errors from the underlying store. Surfaced through the tenancy layer
/// unmodified - masking them would be indistinguishable from leaking data.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<FilterError> for StoreError {
    fn from(err: FilterError) -> Self {
        StoreError::Query(err.to_string())
    }
}

/// The raw data store boundary.
///
/// Implementations are tenant-oblivious: they execute exactly the filter
/// and payload they are given. Tenant scoping happens strictly above this
/// trait, in the interceptor - nothing below it may be reachable by
/// application code.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Select records matching the filter, honoring order/limit/offset
    async fn select(&self, entity: &str, filter: &FilterData) -> Result<Vec<Value>, StoreError>;

    /// Insert records, returning them as stored (with system fields)
    async fn insert(&self, entity: &str, records: Vec<Value>) -> Result<Vec<Value>, StoreError>;

    /// Apply changes to matching records, returning the updated rows
    async fn update(
        &self,
        entity: &str,
        filter: &FilterData,
        changes: &Value,
    ) -> Result<Vec<Value>, StoreError>;

    /// Delete matching records, returning how many were removed
    async fn delete(&self, entity: &str, filter: &FilterData) -> Result<u64, StoreError>;

    /// Count matching records (limit/offset are ignored)
    async fn count(&self, entity: &str, filter: &FilterData) -> Result<u64, StoreError>;

    /// Count matching records grouped by the value of one field
    async fn group_count(
        &self,
        entity: &str,
        filter: &FilterData,
        group_by: &str,
    ) -> Result<Vec<(Value, u64)>, StoreError>;
}
