pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod interceptor;
pub mod operation;
pub mod registry;
pub mod store;

pub use client::{ScopedClient, Tenancy};
pub use context::{IdentityAssertion, TenantContext, TenantId};
pub use error::TenancyError;
pub use registry::{ClassificationMode, EntityClass, ScopeRegistry};
