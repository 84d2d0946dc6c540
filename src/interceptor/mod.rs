use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config;
use crate::context::TenantContext;
use crate::error::TenancyError;
use crate::filter::{FilterData, FilterWhere};
use crate::operation::{OperationDescriptor, OperationKind, OperationPayload};
use crate::registry::{ClassificationMode, EntityClass, ScopeRegistry};

/// The foreign-key-like field every scoped row carries
pub const TENANT_FIELD: &str = "tenant_id";

/// Rewrite an operation descriptor so it is tenant-safe.
///
/// Scoped entities get the context tenant injected into filter and/or
/// payload per operation kind. Global entities pass through untouched.
/// Unknown entities, missing context and conflicting caller-supplied tenant
/// values all reject the operation before the store is reached - the layer
/// fails closed, never open.
pub fn rewrite(
    descriptor: OperationDescriptor,
    context: Option<&TenantContext>,
    registry: &ScopeRegistry,
) -> Result<OperationDescriptor, TenancyError> {
    match registry.classify(&descriptor.entity) {
        EntityClass::Global => Ok(descriptor),
        EntityClass::Unknown => match registry.mode() {
            ClassificationMode::RequireExplicit => {
                audit_reject(&descriptor, "UNKNOWN_ENTITY");
                Err(TenancyError::UnknownEntity(descriptor.entity))
            }
            ClassificationMode::PassthroughUnknown => {
                debug!(
                    entity = %descriptor.entity,
                    operation = descriptor.kind.as_str(),
                    "unclassified entity passed through unscoped"
                );
                Ok(descriptor)
            }
        },
        EntityClass::Scoped => {
            let Some(ctx) = context else {
                audit_reject(&descriptor, "CONTEXT_MISSING");
                return Err(TenancyError::ContextMissing(descriptor.entity));
            };
            rewrite_scoped(descriptor, ctx)
        }
    }
}

fn rewrite_scoped(
    descriptor: OperationDescriptor,
    ctx: &TenantContext,
) -> Result<OperationDescriptor, TenancyError> {
    let tenant = ctx.tenant_id().as_str().to_string();
    let OperationDescriptor {
        entity,
        kind,
        filter,
        payload,
    } = descriptor;

    // Exhaustive by design: a new operation kind must pick its rewrite here
    let (filter, payload) = match kind {
        OperationKind::FindOne
        | OperationKind::FindMany
        | OperationKind::FindOneOrFail
        | OperationKind::DeleteOne
        | OperationKind::DeleteMany
        | OperationKind::Count
        | OperationKind::GroupCount => {
            let filter = inject_filter(filter, &entity, kind, &tenant)?;
            (filter, payload)
        }
        OperationKind::CreateOne => {
            let OperationPayload::One(data) = payload else {
                return Err(invalid_payload(kind));
            };
            let data = inject_payload(data, &entity, kind, &tenant)?;
            (filter, OperationPayload::One(data))
        }
        OperationKind::CreateMany => {
            let OperationPayload::Many(rows) = payload else {
                return Err(invalid_payload(kind));
            };
            let rows = rows
                .into_iter()
                .map(|row| inject_payload(row, &entity, kind, &tenant))
                .collect::<Result<Vec<_>, _>>()?;
            (filter, OperationPayload::Many(rows))
        }
        OperationKind::UpdateOne | OperationKind::UpdateMany => {
            let OperationPayload::One(changes) = payload else {
                return Err(invalid_payload(kind));
            };
            // Rows already own their tenant; changes may not reassign it
            verify_payload_tenant(&changes, &entity, kind, &tenant)?;
            let filter = inject_filter(filter, &entity, kind, &tenant)?;
            (filter, OperationPayload::One(changes))
        }
        OperationKind::Upsert => {
            let OperationPayload::Upsert { create, update } = payload else {
                return Err(invalid_payload(kind));
            };
            let create = inject_payload(create, &entity, kind, &tenant)?;
            let update = inject_payload(update, &entity, kind, &tenant)?;
            let filter = inject_filter(filter, &entity, kind, &tenant)?;
            (filter, OperationPayload::Upsert { create, update })
        }
    };

    debug!(
        entity = %entity,
        operation = kind.as_str(),
        request_id = %ctx.request_id,
        "operation rewritten with tenant scope"
    );

    Ok(OperationDescriptor {
        entity,
        kind,
        filter,
        payload,
    })
}

/// AND-combine the tenant predicate with the caller's where clause
fn inject_filter(
    filter: FilterData,
    entity: &str,
    kind: OperationKind,
    tenant: &str,
) -> Result<FilterData, TenancyError> {
    let where_clause = match filter.where_clause {
        None => json!({ TENANT_FIELD: tenant }),
        Some(clause) => {
            FilterWhere::validate(&clause)?;
            scan_where_for_conflicts(&clause, entity, kind, tenant)?;
            merge_tenant_clause(clause, tenant)
        }
    };
    Ok(FilterData {
        where_clause: Some(where_clause),
        ..filter
    })
}

fn merge_tenant_clause(clause: Value, tenant: &str) -> Value {
    match clause {
        Value::Object(mut map) => {
            if map.keys().any(|k| k.starts_with('$')) {
                // Logical operators present: wrap so the tenant predicate
                // can never end up inside a disjunction
                json!({ "$and": [Value::Object(map), { TENANT_FIELD: tenant }] })
            } else {
                // Mismatches were already rejected; insert normalizes an
                // equal caller-supplied value to the plain form
                map.insert(TENANT_FIELD.to_string(), Value::String(tenant.to_string()));
                Value::Object(map)
            }
        }
        _ => json!({ TENANT_FIELD: tenant }),
    }
}

/// Recursively reject any tenant predicate that is not exactly the context
/// tenant. Nested occurrences under logical operators are probing attempts
/// or bugs either way.
fn scan_where_for_conflicts(
    clause: &Value,
    entity: &str,
    kind: OperationKind,
    tenant: &str,
) -> Result<(), TenancyError> {
    match clause {
        Value::Object(map) => {
            for (key, value) in map {
                if key == TENANT_FIELD {
                    if !tenant_condition_is_exact(value, tenant) {
                        return Err(tenant_mismatch(entity, kind));
                    }
                } else {
                    scan_where_for_conflicts(value, entity, kind, tenant)?;
                }
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items {
                scan_where_for_conflicts(item, entity, kind, tenant)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Only a plain string equal to the context tenant, or `{"$eq": tenant}`,
/// is accepted; any other shape could widen the scope.
fn tenant_condition_is_exact(condition: &Value, tenant: &str) -> bool {
    match condition {
        Value::String(s) => s == tenant,
        Value::Object(map) => {
            map.len() == 1 && map.get("$eq").and_then(|v| v.as_str()) == Some(tenant)
        }
        _ => false,
    }
}

/// Inject the tenant into a write payload, rejecting conflicting values
fn inject_payload(
    data: Value,
    entity: &str,
    kind: OperationKind,
    tenant: &str,
) -> Result<Value, TenancyError> {
    let Value::Object(mut map) = data else {
        return Err(TenancyError::InvalidRequest(format!(
            "{} payload must be a JSON object",
            kind.as_str()
        )));
    };
    match map.get(TENANT_FIELD) {
        Some(Value::String(existing)) if existing == tenant => {}
        Some(_) => return Err(tenant_mismatch(entity, kind)),
        None => {}
    }
    map.insert(TENANT_FIELD.to_string(), Value::String(tenant.to_string()));
    Ok(Value::Object(map))
}

/// Update changes may carry the tenant field only if it equals the context
/// tenant - ownership is set at creation and never reassigned.
fn verify_payload_tenant(
    changes: &Value,
    entity: &str,
    kind: OperationKind,
    tenant: &str,
) -> Result<(), TenancyError> {
    let Value::Object(map) = changes else {
        return Err(TenancyError::InvalidRequest(format!(
            "{} payload must be a JSON object",
            kind.as_str()
        )));
    };
    match map.get(TENANT_FIELD) {
        None => Ok(()),
        Some(Value::String(existing)) if existing == tenant => Ok(()),
        Some(_) => Err(tenant_mismatch(entity, kind)),
    }
}

fn tenant_mismatch(entity: &str, kind: OperationKind) -> TenancyError {
    let err = TenancyError::TenantMismatch {
        entity: entity.to_string(),
        operation: kind.as_str(),
    };
    if config::config().enable_audit_logging {
        warn!(
            entity = %entity,
            operation = kind.as_str(),
            code = err.error_code(),
            "operation rejected"
        );
    }
    err
}

fn audit_reject(descriptor: &OperationDescriptor, code: &'static str) {
    if config::config().enable_audit_logging {
        warn!(
            entity = %descriptor.entity,
            operation = descriptor.kind.as_str(),
            code = code,
            "operation rejected"
        );
    }
}

fn invalid_payload(kind: OperationKind) -> TenancyError {
    TenancyError::InvalidRequest(format!(
        "payload shape does not match operation kind {}",
        kind.as_str()
    ))
}
