#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use bloom_tenancy::filter::FilterData;
use bloom_tenancy::store::{DataStore, MemoryStore, StoreError};
use bloom_tenancy::{IdentityAssertion, ScopeRegistry, Tenancy};

static TRACING: std::sync::Once = std::sync::Once::new();

/// Install the test subscriber once; RUST_LOG controls verbosity
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Registry fixture matching the platform's core entity types
pub fn registry() -> ScopeRegistry {
    ScopeRegistry::builder()
        .scoped("contacts")
        .scoped("journal_entries")
        .scoped("goals")
        .global("tenants")
        .build()
        .expect("valid registry")
}

pub fn assertion(tenant: &str) -> IdentityAssertion {
    IdentityAssertion::new(tenant, Uuid::new_v4(), "member")
}

/// Tenancy layer over a memory store, returning a raw handle for
/// store-level assertions
pub fn tenancy() -> (Tenancy<MemoryStore>, MemoryStore) {
    init_tracing();
    let store = MemoryStore::new();
    (Tenancy::new(store.clone(), registry()), store)
}

/// Store wrapper counting every call that reaches the store layer.
/// Fail-closed tests assert the count stays at zero.
#[derive(Clone, Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    calls: Arc<AtomicUsize>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataStore for RecordingStore {
    async fn select(&self, entity: &str, filter: &FilterData) -> Result<Vec<Value>, StoreError> {
        self.record();
        self.inner.select(entity, filter).await
    }

    async fn insert(&self, entity: &str, records: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        self.record();
        self.inner.insert(entity, records).await
    }

    async fn update(
        &self,
        entity: &str,
        filter: &FilterData,
        changes: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        self.record();
        self.inner.update(entity, filter, changes).await
    }

    async fn delete(&self, entity: &str, filter: &FilterData) -> Result<u64, StoreError> {
        self.record();
        self.inner.delete(entity, filter).await
    }

    async fn count(&self, entity: &str, filter: &FilterData) -> Result<u64, StoreError> {
        self.record();
        self.inner.count(entity, filter).await
    }

    async fn group_count(
        &self,
        entity: &str,
        filter: &FilterData,
        group_by: &str,
    ) -> Result<Vec<(Value, u64)>, StoreError> {
        self.record();
        self.inner.group_count(entity, filter, group_by).await
    }
}
