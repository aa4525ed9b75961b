//! Executor Registry
//!
//! Named execution contexts with exactly one active selection. The two
//! built-ins are created on initialization; callers may add or overwrite
//! entries at any time. Entries are never removed.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::context::{ExecutionContext, PoolConfig, ThreadPool};
use crate::error::{Error, Result};

/// Built-in multi-worker service
pub const MULTI: &str = "multi";

/// Built-in single-worker service (selected by default)
pub const SINGLE: &str = "single";

/// Shared handle to a registered context
pub type SharedContext = Arc<dyn ExecutionContext>;

// ─────────────────────────────────────────────────────────────────
// Executor Registry
// ─────────────────────────────────────────────────────────────────

/// Mapping from service name to execution context, plus the active entry
pub struct ExecutorRegistry {
    services: HashMap<String, SharedContext>,
    active_name: String,
    presets: Presets,
}

#[derive(Clone)]
struct Presets {
    multi: PoolConfig,
    single: PoolConfig,
}

impl Presets {
    fn build(&self) -> HashMap<String, SharedContext> {
        let mut services: HashMap<String, SharedContext> = HashMap::new();
        services.insert(MULTI.to_string(), Arc::new(ThreadPool::from_config(self.multi.clone())));
        services.insert(SINGLE.to_string(), Arc::new(ThreadPool::from_config(self.single.clone())));
        services
    }
}

impl Default for Presets {
    fn default() -> Self {
        Self {
            multi: PoolConfig::multi(),
            single: PoolConfig::single(),
        }
    }
}

impl ExecutorRegistry {
    /// Registry with the default built-in presets, `single` selected
    pub fn new() -> Self {
        Self::from_presets(Presets::default())
    }

    /// Registry whose built-ins use the given pool sizing, `single` selected
    ///
    /// The single-worker preset is clamped to exactly one worker.
    pub fn with_presets(multi: PoolConfig, single: PoolConfig) -> Result<Self> {
        let single = single.with_core_threads(1).with_max_threads(1);
        multi.validate()?;
        single.validate()?;
        Ok(Self::from_presets(Presets { multi, single }))
    }

    fn from_presets(presets: Presets) -> Self {
        let mut registry = Self {
            services: HashMap::new(),
            active_name: SINGLE.to_string(),
            presets,
        };
        registry.initialize();
        registry
    }

    /// Create the built-in contexts if the registry is empty
    ///
    /// Returns whether anything was created. Calling it again is a no-op.
    pub fn initialize(&mut self) -> bool {
        if !self.services.is_empty() {
            return false;
        }

        self.services = self.presets.build();

        debug!(services = ?self.names(), "Built-in services initialized");
        true
    }

    /// Insert or overwrite `name`
    ///
    /// No validation is done on the context; the caller owns its lifecycle.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        context: impl ExecutionContext + 'static,
    ) -> &mut Self {
        self.register_shared(name, Arc::new(context))
    }

    /// Insert or overwrite `name` with an already shared context
    pub fn register_shared(&mut self, name: impl Into<String>, context: SharedContext) -> &mut Self {
        let name = name.into();

        info!(service = %name, context = %context.describe(), "Service registered");

        self.services.insert(name, context);
        self
    }

    /// Make `name` the active service
    ///
    /// Resolves immediately; an unregistered name fails and leaves the
    /// current selection in place.
    pub fn select(&mut self, name: &str) -> Result<&mut Self> {
        if !self.services.contains_key(name) {
            return Err(Error::unknown_service(name, self.names()));
        }

        self.active_name = name.to_string();

        debug!(service = %name, "Service selected");
        Ok(self)
    }

    pub fn active_name(&self) -> &str {
        &self.active_name
    }

    /// The active context, shared so it can be used without borrowing the registry
    ///
    /// Looked up by name, so re-registering the active name takes effect for
    /// the next submission.
    pub fn active_context(&self) -> Result<SharedContext> {
        self.services
            .get(&self.active_name)
            .cloned()
            .ok_or_else(|| Error::unknown_service(self.active_name.as_str(), self.names()))
    }

    pub fn get(&self, name: &str) -> Option<SharedContext> {
        self.services.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("services", &self.names())
            .field("active", &self.active_name)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Inline;

    #[test]
    fn test_builtins_present() {
        let registry = ExecutorRegistry::new();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(MULTI));
        assert!(registry.contains(SINGLE));
        assert_eq!(registry.active_name(), SINGLE);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut registry = ExecutorRegistry::new();
        let before = registry.get(MULTI).unwrap();

        assert!(!registry.initialize());
        assert!(Arc::ptr_eq(&before, &registry.get(MULTI).unwrap()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_initialize_fills_empty_registry() {
        let mut registry = ExecutorRegistry {
            services: HashMap::new(),
            active_name: SINGLE.to_string(),
            presets: Presets::default(),
        };
        assert!(registry.is_empty());
        assert!(registry.active_context().is_err());

        assert!(registry.initialize());

        assert_eq!(registry.names(), vec![MULTI, SINGLE]);
        assert!(Arc::ptr_eq(&registry.active_context().unwrap(), &registry.get(SINGLE).unwrap()));
        assert!(!registry.initialize());
    }

    #[test]
    fn test_default_selection_is_single_preset() {
        let registry = ExecutorRegistry::new();
        let single = registry.get(SINGLE).unwrap();

        assert!(Arc::ptr_eq(&single, &registry.active_context().unwrap()));
    }

    #[test]
    fn test_register_and_select() {
        let mut registry = ExecutorRegistry::new();
        registry.register("inline", Inline).select("inline").unwrap();

        assert_eq!(registry.active_name(), "inline");
        assert_eq!(registry.active_context().unwrap().describe(), "inline (caller thread)");
        assert_eq!(registry.names(), vec!["inline", "multi", "single"]);
    }

    #[test]
    fn test_select_unknown_keeps_previous() {
        let mut registry = ExecutorRegistry::new();
        registry.select(MULTI).unwrap();

        let err = registry.select("bogus").unwrap_err();

        assert!(matches!(err, Error::UnknownService { ref name, .. } if name == "bogus"));
        assert!(err.is_configuration());
        assert_eq!(registry.active_name(), MULTI);
        assert!(Arc::ptr_eq(&registry.active_context().unwrap(), &registry.get(MULTI).unwrap()));
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = ExecutorRegistry::new();
        registry.register(MULTI, Inline);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(MULTI).unwrap().describe(), "inline (caller thread)");
    }

    #[test]
    fn test_overwriting_active_refreshes_selection() {
        let mut registry = ExecutorRegistry::new();
        registry.register(SINGLE, Inline);

        assert_eq!(registry.active_name(), SINGLE);
        assert_eq!(registry.active_context().unwrap().describe(), "inline (caller thread)");
    }

    #[test]
    fn test_invalid_presets_rejected() {
        let multi = PoolConfig::multi().with_core_threads(10).with_max_threads(2);
        let err = ExecutorRegistry::with_presets(multi, PoolConfig::single()).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_presets_are_applied() {
        let multi = PoolConfig::multi().with_name("tuned").with_core_threads(2).with_max_threads(4);
        let single = PoolConfig::single().with_name("serial").with_max_threads(8);
        let registry = ExecutorRegistry::with_presets(multi, single).unwrap();

        let multi_desc = registry.get(MULTI).unwrap().describe();
        assert!(multi_desc.contains("tuned"));
        assert!(multi_desc.contains("2..4"));

        let single_desc = registry.get(SINGLE).unwrap().describe();
        assert!(single_desc.contains("serial"));
        assert!(single_desc.contains("1..1"));
    }
}
