use std::collections::HashSet;
use thiserror::Error;

/// Classification of an entity type with respect to tenant scoping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityClass {
    /// Rows carry a tenant_id and every operation is rewritten
    Scoped,
    /// Explicitly exempt from scoping (e.g. the tenant directory itself)
    Global,
    /// Present in neither list
    Unknown,
}

/// How the interceptor treats entity types absent from both lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationMode {
    /// Unknown entity types fail the operation, forcing a deliberate
    /// classification when a new entity type is added. Default.
    RequireExplicit,
    /// Unknown entity types pass through unscoped. Only for migration
    /// windows where the registry is still being backfilled.
    PassthroughUnknown,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Entity type '{0}' declared both scoped and global")]
    ConflictingClassification(String),
}

/// Static allow-list of tenant-scoped entity types.
///
/// The registry is the single source of truth for scoping decisions. It is
/// immutable after construction; changing it is a reviewed code change, not
/// a runtime toggle.
#[derive(Debug, Clone)]
pub struct ScopeRegistry {
    scoped: HashSet<String>,
    global: HashSet<String>,
    mode: ClassificationMode,
}

impl ScopeRegistry {
    pub fn builder() -> ScopeRegistryBuilder {
        ScopeRegistryBuilder::new()
    }

    pub fn classify(&self, entity: &str) -> EntityClass {
        if self.scoped.contains(entity) {
            EntityClass::Scoped
        } else if self.global.contains(entity) {
            EntityClass::Global
        } else {
            EntityClass::Unknown
        }
    }

    pub fn is_scoped(&self, entity: &str) -> bool {
        self.classify(entity) == EntityClass::Scoped
    }

    pub fn mode(&self) -> ClassificationMode {
        self.mode
    }

    /// Entity types in the scoped list, for config review dumps
    pub fn scoped_entities(&self) -> impl Iterator<Item = &str> {
        self.scoped.iter().map(|s| s.as_str())
    }

    /// Entity types in the explicit-global list
    pub fn global_entities(&self) -> impl Iterator<Item = &str> {
        self.global.iter().map(|s| s.as_str())
    }
}

pub struct ScopeRegistryBuilder {
    scoped: HashSet<String>,
    global: HashSet<String>,
    mode: ClassificationMode,
}

impl ScopeRegistryBuilder {
    fn new() -> Self {
        Self {
            scoped: HashSet::new(),
            global: HashSet::new(),
            mode: ClassificationMode::RequireExplicit,
        }
    }

    /// Declare a tenant-scoped entity type
    pub fn scoped(mut self, entity: impl Into<String>) -> Self {
        self.scoped.insert(entity.into());
        self
    }

    /// Declare an explicitly global (unscoped) entity type
    pub fn global(mut self, entity: impl Into<String>) -> Self {
        self.global.insert(entity.into());
        self
    }

    pub fn mode(mut self, mode: ClassificationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn build(self) -> Result<ScopeRegistry, RegistryError> {
        if let Some(conflict) = self.scoped.intersection(&self.global).next() {
            return Err(RegistryError::ConflictingClassification(conflict.clone()));
        }
        Ok(ScopeRegistry {
            scoped: self.scoped,
            global: self.global,
            mode: self.mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ScopeRegistry {
        ScopeRegistry::builder()
            .scoped("contacts")
            .scoped("journal_entries")
            .global("tenants")
            .build()
            .unwrap()
    }

    #[test]
    fn classifies_by_explicit_lists() {
        let reg = registry();
        assert_eq!(reg.classify("contacts"), EntityClass::Scoped);
        assert_eq!(reg.classify("tenants"), EntityClass::Global);
        assert_eq!(reg.classify("widgets"), EntityClass::Unknown);
    }

    #[test]
    fn classification_is_idempotent() {
        let reg = registry();
        for _ in 0..100 {
            assert!(reg.is_scoped("journal_entries"));
            assert!(!reg.is_scoped("tenants"));
        }
    }

    #[test]
    fn rejects_conflicting_classification() {
        let result = ScopeRegistry::builder()
            .scoped("contacts")
            .global("contacts")
            .build();
        assert!(matches!(
            result,
            Err(RegistryError::ConflictingClassification(e)) if e == "contacts"
        ));
    }

    #[test]
    fn default_mode_requires_explicit_classification() {
        assert_eq!(registry().mode(), ClassificationMode::RequireExplicit);
    }
}
