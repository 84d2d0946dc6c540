use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

/// Process-wide tenancy layer configuration.
///
/// The scope registry itself is deliberately NOT configured here - entity
/// classification is a reviewed code change, not a runtime toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    /// Emit a warn-level audit event for every rejected operation
    pub enable_audit_logging: bool,
    /// Applied to find_many calls that do not specify their own limit
    pub default_select_limit: Option<i32>,
    /// Upper bound on create_many batch size
    pub max_write_batch: usize,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            enable_audit_logging: true,
            default_select_limit: Some(1000),
            max_write_batch: 500,
        }
    }
}

impl TenancyConfig {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("TENANCY_ENABLE_AUDIT_LOGGING") {
            self.enable_audit_logging = v.parse().unwrap_or(self.enable_audit_logging);
        }
        if let Ok(v) = env::var("TENANCY_DEFAULT_SELECT_LIMIT") {
            self.default_select_limit = v.parse().ok();
        }
        if let Ok(v) = env::var("TENANCY_MAX_WRITE_BATCH") {
            self.max_write_batch = v.parse().unwrap_or(self.max_write_batch);
        }
        self
    }
}

pub static CONFIG: Lazy<TenancyConfig> = Lazy::new(TenancyConfig::from_env);

/// Global configuration accessor
pub fn config() -> &'static TenancyConfig {
    &CONFIG
}
