//! Explicit module registry.
//!
//! Modules are registered by the orchestrator's startup path, never as a
//! side effect of loading their code. [`ModuleRegistry`] is an owned value
//! for tests and embedding; [`init`] / [`teardown`] manage the one
//! process-wide instance.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::RegistryError;
use crate::module::Module;

/// Modules keyed by their registration id.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Arc<dyn Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module` under `id`. Ids are unique.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        module: Arc<dyn Module>,
    ) -> Result<(), RegistryError> {
        let id = id.into();
        if self.modules.contains_key(&id) {
            return Err(RegistryError::DuplicateModule(id));
        }
        tracing::debug!(id = %id, module = %module.name(), "module registered");
        self.modules.insert(id, module);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Module>> {
        self.modules.get(id).cloned()
    }

    /// Like [`get`](Self::get) but with a typed error.
    pub fn require(&self, id: &str) -> Result<Arc<dyn Module>, RegistryError> {
        self.get(id)
            .ok_or_else(|| RegistryError::UnknownModule(id.to_string()))
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Module>)> {
        self.modules.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish()
    }
}

static GLOBAL: RwLock<Option<Arc<ModuleRegistry>>> = RwLock::new(None);

fn read() -> RwLockReadGuard<'static, Option<Arc<ModuleRegistry>>> {
    GLOBAL.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write() -> RwLockWriteGuard<'static, Option<Arc<ModuleRegistry>>> {
    GLOBAL.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Install the process-wide registry. Fails if one is already installed.
pub fn init(registry: ModuleRegistry) -> Result<Arc<ModuleRegistry>, RegistryError> {
    let mut slot = write();
    if slot.is_some() {
        return Err(RegistryError::AlreadyInitialized);
    }
    let registry = Arc::new(registry);
    tracing::info!(modules = registry.len(), "module registry initialized");
    *slot = Some(Arc::clone(&registry));
    Ok(registry)
}

/// The process-wide registry.
pub fn global() -> Result<Arc<ModuleRegistry>, RegistryError> {
    read().clone().ok_or(RegistryError::NotInitialized)
}

/// Run `f` against the process-wide registry.
pub fn with_registry<T>(f: impl FnOnce(&ModuleRegistry) -> T) -> Result<T, RegistryError> {
    let guard = read();
    let registry = guard.as_ref().ok_or(RegistryError::NotInitialized)?;
    Ok(f(registry))
}

/// Look up one module in the process-wide registry.
pub fn lookup(id: &str) -> Result<Arc<dyn Module>, RegistryError> {
    global()?.require(id)
}

pub fn is_initialized() -> bool {
    read().is_some()
}

/// Remove the process-wide registry, returning it if one was installed.
/// Outstanding `Arc`s stay valid.
pub fn teardown() -> Option<Arc<ModuleRegistry>> {
    let taken = write().take();
    if taken.is_some() {
        tracing::info!("module registry torn down");
    }
    taken
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::ArgumentSpec;
    use crate::context::RunContext;
    use crate::error::ModuleError;
    use crate::module::ArgumentContext;
    use async_trait::async_trait;

    // Lets `unwrap_err()` be called on `Result<Arc<dyn Module>, _>` in tests.
    impl std::fmt::Debug for dyn Module {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_tuple("Module").field(&self.name()).finish()
        }
    }

    struct Named(&'static str);

    #[async_trait]
    impl Module for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            ""
        }

        fn modeler_description(&self) -> &str {
            ""
        }

        fn arguments(&self, _context: &ArgumentContext<'_>) -> Vec<ArgumentSpec> {
            vec![]
        }

        async fn run(&self, _ctx: &mut RunContext<'_>) -> Result<(), ModuleError> {
            Ok(())
        }
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut reg = ModuleRegistry::new();
        reg.register("a", Arc::new(Named("A"))).unwrap();
        let err = reg.register("a", Arc::new(Named("A2"))).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateModule("a".to_string()));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("a").unwrap().name(), "A");
    }

    #[test]
    fn test_require_unknown() {
        let reg = ModuleRegistry::new();
        assert_eq!(
            reg.require("missing").unwrap_err(),
            RegistryError::UnknownModule("missing".to_string())
        );
    }

    #[test]
    fn test_ids_sorted() {
        let mut reg = ModuleRegistry::new();
        reg.register("zeta", Arc::new(Named("Z"))).unwrap();
        reg.register("alpha", Arc::new(Named("A"))).unwrap();
        assert_eq!(reg.ids().collect::<Vec<_>>(), vec!["alpha", "zeta"]);
    }

    // The global slot is process-wide, so its whole lifecycle is one test.
    #[test]
    fn test_global_lifecycle() {
        teardown();
        assert!(!is_initialized());
        assert_eq!(global().unwrap_err(), RegistryError::NotInitialized);

        let mut reg = ModuleRegistry::new();
        reg.register("a", Arc::new(Named("A"))).unwrap();
        init(reg).unwrap();
        assert!(is_initialized());
        assert_eq!(
            init(ModuleRegistry::new()).unwrap_err(),
            RegistryError::AlreadyInitialized
        );
        assert_eq!(lookup("a").unwrap().name(), "A");
        assert_eq!(with_registry(|r| r.len()).unwrap(), 1);

        let old = teardown().unwrap();
        assert_eq!(old.len(), 1);
        assert!(teardown().is_none());
        assert!(lookup("a").is_err());
    }
}
