use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::config;
use crate::context::{IdentityAssertion, TenantContext};
use crate::error::TenancyError;
use crate::filter::FilterData;
use crate::interceptor;
use crate::operation::{OperationDescriptor, OperationKind, OperationPayload};
use crate::registry::ScopeRegistry;
use crate::store::DataStore;

/// The single point of enforcement for tenant isolation.
///
/// `Tenancy` owns the raw store privately; the only way application code
/// can reach it is through a [`ScopedClient`], and every client call passes
/// through the interceptor. Exposing the raw store anywhere else would
/// bypass isolation entirely, so don't.
pub struct Tenancy<S: DataStore> {
    store: Arc<S>,
    registry: Arc<ScopeRegistry>,
}

impl<S: DataStore> Tenancy<S> {
    pub fn new(store: S, registry: ScopeRegistry) -> Self {
        Self {
            store: Arc::new(store),
            registry: Arc::new(registry),
        }
    }

    /// Establish the tenant context for one logical request.
    ///
    /// Call exactly once per request, after authentication, before any data
    /// operation. The returned client carries the context for the request's
    /// entire async lineage; clone it freely into parallel sub-tasks - every
    /// clone observes the same tenant. Establishing again simply produces an
    /// independent client; there is no ambient slot to leak through.
    pub fn establish(&self, assertion: IdentityAssertion) -> ScopedClient<S> {
        let context = TenantContext::new(assertion);
        debug!(
            tenant = %context.tenant_id(),
            request_id = %context.request_id,
            "tenant context established"
        );
        ScopedClient {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            context: Some(context),
        }
    }

    /// A context-less client for global-entity access paths (e.g. the
    /// tenant directory during login). Scoped operations through it fail
    /// closed with `ContextMissing`.
    pub fn detached(&self) -> ScopedClient<S> {
        ScopedClient {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            context: None,
        }
    }
}

/// Per-request data access handle with a tenant-oblivious CRUD surface.
///
/// Callers never mention tenants: the interceptor injects the scope into
/// every operation before it reaches the store.
#[derive(Clone)]
pub struct ScopedClient<S: DataStore> {
    store: Arc<S>,
    registry: Arc<ScopeRegistry>,
    context: Option<TenantContext>,
}

impl<S: DataStore> ScopedClient<S> {
    /// The established context, if any
    pub fn context(&self) -> Option<&TenantContext> {
        self.context.as_ref()
    }

    fn rewrite(&self, descriptor: OperationDescriptor) -> Result<OperationDescriptor, TenancyError> {
        interceptor::rewrite(descriptor, self.context.as_ref(), &self.registry)
    }

    pub async fn find_one(
        &self,
        entity: &str,
        filter: FilterData,
    ) -> Result<Option<Value>, TenancyError> {
        let descriptor = OperationDescriptor::filtered(entity, OperationKind::FindOne, filter);
        let mut descriptor = self.rewrite(descriptor)?;
        descriptor.filter.limit = Some(1);
        let rows = self.store.select(&descriptor.entity, &descriptor.filter).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn find_many(
        &self,
        entity: &str,
        filter: FilterData,
    ) -> Result<Vec<Value>, TenancyError> {
        let descriptor = OperationDescriptor::filtered(entity, OperationKind::FindMany, filter);
        let mut descriptor = self.rewrite(descriptor)?;
        if descriptor.filter.limit.is_none() {
            descriptor.filter.limit = config::config().default_select_limit;
        }
        Ok(self.store.select(&descriptor.entity, &descriptor.filter).await?)
    }

    pub async fn find_one_or_fail(
        &self,
        entity: &str,
        filter: FilterData,
    ) -> Result<Value, TenancyError> {
        let descriptor = OperationDescriptor::filtered(entity, OperationKind::FindOneOrFail, filter);
        let mut descriptor = self.rewrite(descriptor)?;
        descriptor.filter.limit = Some(1);
        let rows = self.store.select(&descriptor.entity, &descriptor.filter).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| TenancyError::NotFound(format!("no matching record in '{}'", entity)))
    }

    pub async fn create_one(&self, entity: &str, data: Value) -> Result<Value, TenancyError> {
        let descriptor = self.rewrite(OperationDescriptor::create_one(entity, data))?;
        let OperationPayload::One(data) = descriptor.payload else {
            return Err(TenancyError::InvalidRequest(
                "create_one payload lost in rewrite".to_string(),
            ));
        };
        let mut stored = self.store.insert(&descriptor.entity, vec![data]).await?;
        stored
            .pop()
            .ok_or_else(|| TenancyError::InvalidRequest("store returned no created row".to_string()))
    }

    pub async fn create_many(
        &self,
        entity: &str,
        data: Vec<Value>,
    ) -> Result<Vec<Value>, TenancyError> {
        let max = config::config().max_write_batch;
        if data.len() > max {
            return Err(TenancyError::InvalidRequest(format!(
                "create_many batch of {} exceeds limit of {}",
                data.len(),
                max
            )));
        }
        let descriptor = self.rewrite(OperationDescriptor::create_many(entity, data))?;
        let OperationPayload::Many(rows) = descriptor.payload else {
            return Err(TenancyError::InvalidRequest(
                "create_many payload lost in rewrite".to_string(),
            ));
        };
        Ok(self.store.insert(&descriptor.entity, rows).await?)
    }

    pub async fn update_one(
        &self,
        entity: &str,
        filter: FilterData,
        changes: Value,
    ) -> Result<Option<Value>, TenancyError> {
        let descriptor =
            OperationDescriptor::update(entity, OperationKind::UpdateOne, filter, changes);
        let mut descriptor = self.rewrite(descriptor)?;
        descriptor.filter.limit = Some(1);
        let OperationPayload::One(changes) = descriptor.payload else {
            return Err(TenancyError::InvalidRequest(
                "update_one payload lost in rewrite".to_string(),
            ));
        };
        let updated = self
            .store
            .update(&descriptor.entity, &descriptor.filter, &changes)
            .await?;
        Ok(updated.into_iter().next())
    }

    pub async fn update_many(
        &self,
        entity: &str,
        filter: FilterData,
        changes: Value,
    ) -> Result<Vec<Value>, TenancyError> {
        let descriptor =
            OperationDescriptor::update(entity, OperationKind::UpdateMany, filter, changes);
        let descriptor = self.rewrite(descriptor)?;
        let OperationPayload::One(changes) = descriptor.payload else {
            return Err(TenancyError::InvalidRequest(
                "update_many payload lost in rewrite".to_string(),
            ));
        };
        Ok(self
            .store
            .update(&descriptor.entity, &descriptor.filter, &changes)
            .await?)
    }

    pub async fn delete_one(&self, entity: &str, filter: FilterData) -> Result<bool, TenancyError> {
        let descriptor = OperationDescriptor::filtered(entity, OperationKind::DeleteOne, filter);
        let mut descriptor = self.rewrite(descriptor)?;
        descriptor.filter.limit = Some(1);
        let removed = self.store.delete(&descriptor.entity, &descriptor.filter).await?;
        Ok(removed > 0)
    }

    pub async fn delete_many(&self, entity: &str, filter: FilterData) -> Result<u64, TenancyError> {
        let descriptor = OperationDescriptor::filtered(entity, OperationKind::DeleteMany, filter);
        let descriptor = self.rewrite(descriptor)?;
        Ok(self.store.delete(&descriptor.entity, &descriptor.filter).await?)
    }

    /// Update the first record matching the filter, or create one from the
    /// `create` payload if none matches. Filter and both payloads are
    /// tenant-scoped before anything reaches the store.
    pub async fn upsert(
        &self,
        entity: &str,
        filter: FilterData,
        create: Value,
        update: Value,
    ) -> Result<Value, TenancyError> {
        let descriptor = OperationDescriptor::upsert(entity, filter, create, update);
        let mut descriptor = self.rewrite(descriptor)?;
        descriptor.filter.limit = Some(1);
        let OperationPayload::Upsert { create, update } = descriptor.payload else {
            return Err(TenancyError::InvalidRequest(
                "upsert payload lost in rewrite".to_string(),
            ));
        };

        let existing = self.store.select(&descriptor.entity, &descriptor.filter).await?;
        if existing.is_empty() {
            let mut stored = self.store.insert(&descriptor.entity, vec![create]).await?;
            stored.pop().ok_or_else(|| {
                TenancyError::InvalidRequest("store returned no created row".to_string())
            })
        } else {
            let updated = self
                .store
                .update(&descriptor.entity, &descriptor.filter, &update)
                .await?;
            updated.into_iter().next().ok_or_else(|| {
                TenancyError::InvalidRequest("store returned no updated row".to_string())
            })
        }
    }

    pub async fn count(&self, entity: &str, filter: FilterData) -> Result<u64, TenancyError> {
        let descriptor = OperationDescriptor::filtered(entity, OperationKind::Count, filter);
        let descriptor = self.rewrite(descriptor)?;
        Ok(self.store.count(&descriptor.entity, &descriptor.filter).await?)
    }

    pub async fn group_count(
        &self,
        entity: &str,
        filter: FilterData,
        group_by: &str,
    ) -> Result<Vec<(Value, u64)>, TenancyError> {
        let descriptor = OperationDescriptor::filtered(entity, OperationKind::GroupCount, filter);
        let descriptor = self.rewrite(descriptor)?;
        Ok(self
            .store
            .group_count(&descriptor.entity, &descriptor.filter, group_by)
            .await?)
    }
}
