use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque tenant identifier. Always derived from a verified identity
/// assertion, never from request payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Verified identity produced by the authentication boundary.
///
/// Signature verification and expiry checks happen before this value is
/// constructed; the tenancy layer trusts it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityAssertion {
    pub tenant_id: TenantId,
    pub user_id: Uuid,
    pub role: String,
}

impl IdentityAssertion {
    pub fn new(tenant_id: impl Into<TenantId>, user_id: Uuid, role: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id,
            role: role.into(),
        }
    }
}

/// Ephemeral per-request tenant context.
///
/// Created exactly once per logical request and threaded explicitly through
/// the request's call chain as an immutable value. There is no ambient slot:
/// every async sub-operation sees the context of the client it was handed,
/// so concurrent requests cannot observe each other's tenant.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub user_id: Uuid,
    pub role: String,
    /// Correlation id for tracing, generated at establish time
    pub request_id: Uuid,
}

impl TenantContext {
    pub fn new(assertion: IdentityAssertion) -> Self {
        Self {
            tenant_id: assertion.tenant_id,
            user_id: assertion.user_id,
            role: assertion.role,
            request_id: Uuid::new_v4(),
        }
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_carries_assertion_fields() {
        let user = Uuid::new_v4();
        let ctx = TenantContext::new(IdentityAssertion::new("acme", user, "member"));
        assert_eq!(ctx.tenant_id().as_str(), "acme");
        assert_eq!(ctx.user_id, user);
        assert_eq!(ctx.role, "member");
    }

    #[test]
    fn each_establishment_gets_a_fresh_request_id() {
        let assertion = IdentityAssertion::new("acme", Uuid::new_v4(), "member");
        let a = TenantContext::new(assertion.clone());
        let b = TenantContext::new(assertion);
        assert_ne!(a.request_id, b.request_id);
        assert_eq!(a.tenant_id(), b.tenant_id());
    }
}
