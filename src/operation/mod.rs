use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::FilterData;

/// The closed set of data operation kinds.
///
/// Every kind the store supports is a variant here, so the interceptor's
/// rewrite dispatch is an exhaustive match - adding a new operation kind is
/// a compile-time decision, never a runtime default branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    FindOne,
    FindMany,
    FindOneOrFail,
    CreateOne,
    CreateMany,
    UpdateOne,
    UpdateMany,
    DeleteOne,
    DeleteMany,
    Upsert,
    Count,
    GroupCount,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::FindOne => "find_one",
            OperationKind::FindMany => "find_many",
            OperationKind::FindOneOrFail => "find_one_or_fail",
            OperationKind::CreateOne => "create_one",
            OperationKind::CreateMany => "create_many",
            OperationKind::UpdateOne => "update_one",
            OperationKind::UpdateMany => "update_many",
            OperationKind::DeleteOne => "delete_one",
            OperationKind::DeleteMany => "delete_many",
            OperationKind::Upsert => "upsert",
            OperationKind::Count => "count",
            OperationKind::GroupCount => "group_count",
        }
    }
}

/// Payload half of an operation descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum OperationPayload {
    None,
    One(Value),
    Many(Vec<Value>),
    Upsert { create: Value, update: Value },
}

/// One data operation as submitted to the interceptor.
///
/// Constructed by the scoped client, rewritten at most once by the
/// interceptor, then forwarded unmodified to the store.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub entity: String,
    pub kind: OperationKind,
    pub filter: FilterData,
    pub payload: OperationPayload,
}

impl OperationDescriptor {
    /// Descriptor for filter-only operations (reads, deletes, count)
    pub fn filtered(entity: impl Into<String>, kind: OperationKind, filter: FilterData) -> Self {
        Self {
            entity: entity.into(),
            kind,
            filter,
            payload: OperationPayload::None,
        }
    }

    pub fn create_one(entity: impl Into<String>, data: Value) -> Self {
        Self {
            entity: entity.into(),
            kind: OperationKind::CreateOne,
            filter: FilterData::default(),
            payload: OperationPayload::One(data),
        }
    }

    pub fn create_many(entity: impl Into<String>, data: Vec<Value>) -> Self {
        Self {
            entity: entity.into(),
            kind: OperationKind::CreateMany,
            filter: FilterData::default(),
            payload: OperationPayload::Many(data),
        }
    }

    pub fn update(
        entity: impl Into<String>,
        kind: OperationKind,
        filter: FilterData,
        changes: Value,
    ) -> Self {
        Self {
            entity: entity.into(),
            kind,
            filter,
            payload: OperationPayload::One(changes),
        }
    }

    pub fn upsert(entity: impl Into<String>, filter: FilterData, create: Value, update: Value) -> Self {
        Self {
            entity: entity.into(),
            kind: OperationKind::Upsert,
            filter,
            payload: OperationPayload::Upsert { create, update },
        }
    }
}
