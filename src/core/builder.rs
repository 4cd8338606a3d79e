use std::sync::Arc;

use crate::core::config::RuntimeConfig;
use crate::core::runtime::Runtime;
use crate::modules::ModuleResolver;

/// Builder for constructing a [`Runtime`] with optional features.
pub struct RuntimeBuilder {
    cfg: RuntimeConfig,
    resolver: Option<Arc<dyn ModuleResolver>>,
}

impl RuntimeBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: RuntimeConfig) -> Self {
        Self {
            cfg,
            resolver: None,
        }
    }

    /// Sets the worker pool size (`0` = CPU count).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.cfg.threads = threads;
        self
    }

    /// Appends `;`-separated templates to the module search path.
    pub fn with_search_path(mut self, path: &str) -> Self {
        self.cfg.search_path.push(path);
        self
    }

    /// Sets the resolver used by `require` for names that were not preloaded.
    ///
    /// Without a resolver only preloaded and explicitly passed handlers can be
    /// required.
    pub fn with_resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Builds and returns the runtime.
    ///
    /// This consumes the builder and initializes the runtime components:
    /// - Root service (counted as live, slot handler unset)
    /// - Name registry with the root service registered
    /// - Signal node pool and shutdown token
    ///
    /// Workers are not spawned until [`Runtime::start`] is called.
    pub fn build(self) -> Runtime {
        Runtime::new_internal(self.cfg, self.resolver)
    }
}
