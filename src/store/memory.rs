use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DataStore, StoreError};
use crate::filter::{FilterData, FilterOrder, FilterWhere};

/// Fields stamped by the store itself; caller payloads may not set them
const SYSTEM_FIELDS: &[&str] = &["id", "created_at", "updated_at"];

/// In-memory data store used by test suites and local development.
///
/// Tables are plain vectors of JSON objects in insertion order. Cloning the
/// store clones the handle, not the data, so tests can keep a handle for
/// inspection while the tenancy layer owns the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, Vec<Map<String, Value>>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total rows in a table, for test assertions
    pub async fn table_len(&self, entity: &str) -> usize {
        self.tables
            .read()
            .await
            .get(entity)
            .map(|rows| rows.len())
            .unwrap_or(0)
    }

    /// Raw table contents, bypassing all filtering. Test inspection only.
    pub async fn dump(&self, entity: &str) -> Vec<Value> {
        self.tables
            .read()
            .await
            .get(entity)
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    fn require_object(record: Value) -> Result<Map<String, Value>, StoreError> {
        match record {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::Query("record must be a JSON object".to_string())),
        }
    }

    fn reject_system_fields(map: &Map<String, Value>) -> Result<(), StoreError> {
        for field in SYSTEM_FIELDS {
            if map.contains_key(*field) {
                return Err(StoreError::Query(format!(
                    "system field '{}' cannot be set by caller payloads",
                    field
                )));
            }
        }
        Ok(())
    }

    /// Indices of rows matching the where clause, in insertion order,
    /// honoring offset and limit
    fn matching_indices(
        rows: &[Map<String, Value>],
        filter: &FilterData,
    ) -> Result<Vec<usize>, StoreError> {
        let where_clause = filter.where_clause.clone().unwrap_or(Value::Null);
        let mut matched = Vec::new();
        for (idx, row) in rows.iter().enumerate() {
            if FilterWhere::matches(&where_clause, row)? {
                matched.push(idx);
            }
        }
        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let matched: Vec<usize> = matched.into_iter().skip(offset).collect();
        if let Some(limit) = filter.limit {
            let limit = limit.max(0) as usize;
            return Ok(matched.into_iter().take(limit).collect());
        }
        Ok(matched)
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn select(&self, entity: &str, filter: &FilterData) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.read().await;
        let Some(rows) = tables.get(entity) else {
            return Ok(vec![]);
        };

        let where_clause = filter.where_clause.clone().unwrap_or(Value::Null);
        let mut matched: Vec<Map<String, Value>> = Vec::new();
        for row in rows {
            if FilterWhere::matches(&where_clause, row)? {
                matched.push(row.clone());
            }
        }

        if let Some(order) = &filter.order {
            let infos = FilterOrder::validate_and_parse(order)?;
            FilterOrder::sort_records(&mut matched, &infos);
        }

        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let matched = matched.into_iter().skip(offset);
        let matched: Vec<Value> = match filter.limit {
            Some(limit) => matched
                .take(limit.max(0) as usize)
                .map(Value::Object)
                .collect(),
            None => matched.map(Value::Object).collect(),
        };
        Ok(matched)
    }

    async fn insert(&self, entity: &str, records: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        let mut stored = Vec::with_capacity(records.len());
        let mut tables = self.tables.write().await;
        let table = tables.entry(entity.to_string()).or_default();

        let now = Utc::now().to_rfc3339();
        for record in records {
            let mut map = Self::require_object(record)?;
            Self::reject_system_fields(&map)?;
            map.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
            map.insert("created_at".to_string(), Value::String(now.clone()));
            map.insert("updated_at".to_string(), Value::String(now.clone()));
            table.push(map.clone());
            stored.push(Value::Object(map));
        }
        Ok(stored)
    }

    async fn update(
        &self,
        entity: &str,
        filter: &FilterData,
        changes: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        let changes = match changes {
            Value::Object(map) => map,
            _ => return Err(StoreError::Query("changes must be a JSON object".to_string())),
        };
        Self::reject_system_fields(changes)?;

        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(entity) else {
            return Ok(vec![]);
        };

        let indices = Self::matching_indices(rows, filter)?;
        let now = Utc::now().to_rfc3339();
        let mut updated = Vec::with_capacity(indices.len());
        for idx in indices {
            let row = &mut rows[idx];
            for (key, value) in changes {
                row.insert(key.clone(), value.clone());
            }
            row.insert("updated_at".to_string(), Value::String(now.clone()));
            updated.push(Value::Object(row.clone()));
        }
        Ok(updated)
    }

    async fn delete(&self, entity: &str, filter: &FilterData) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(entity) else {
            return Ok(0);
        };

        let indices = Self::matching_indices(rows, filter)?;
        for idx in indices.iter().rev() {
            rows.remove(*idx);
        }
        Ok(indices.len() as u64)
    }

    async fn count(&self, entity: &str, filter: &FilterData) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        let Some(rows) = tables.get(entity) else {
            return Ok(0);
        };
        let where_clause = filter.where_clause.clone().unwrap_or(Value::Null);
        let mut count = 0u64;
        for row in rows {
            if FilterWhere::matches(&where_clause, row)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn group_count(
        &self,
        entity: &str,
        filter: &FilterData,
        group_by: &str,
    ) -> Result<Vec<(Value, u64)>, StoreError> {
        let tables = self.tables.read().await;
        let Some(rows) = tables.get(entity) else {
            return Ok(vec![]);
        };
        let where_clause = filter.where_clause.clone().unwrap_or(Value::Null);
        let mut groups: HashMap<String, (Value, u64)> = HashMap::new();
        for row in rows {
            if FilterWhere::matches(&where_clause, row)? {
                let key = row.get(group_by).cloned().unwrap_or(Value::Null);
                let entry = groups.entry(key.to_string()).or_insert((key, 0));
                entry.1 += 1;
            }
        }
        // Deterministic output order for assertions and stable dashboards
        let mut out: Vec<(Value, u64)> = groups.into_values().collect();
        out.sort_by(|a, b| a.0.to_string().cmp(&b.0.to_string()));
        Ok(out)
    }
}
