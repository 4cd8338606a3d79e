//! # Service resolution by name.
//!
//! `require(name)` first consumes a preloaded factory, then falls back to the
//! runtime's [`ModuleResolver`], if one was configured.
//!
//! ## Architecture
//! ```text
//! SearchPathResolver::resolve(name, path)
//!   for candidate in path.candidates(name):
//!       loader.load(candidate, entry_symbol(name))
//!         ├─ Some(handler) ─► return it
//!         └─ None          ─► next candidate
//!   None
//! ```
//!
//! Loading native code is delegated to a [`ModuleLoader`]. The crate ships
//! [`StaticLoader`], an in-process symbol table for statically linked services.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::modules::path::SearchPath;
use crate::services::ServiceHandler;

/// Locates the startup handler of a named service.
pub trait ModuleResolver: Send + Sync + 'static {
    /// Returns the startup handler for `name`, or `None` if it cannot be found.
    fn resolve(&self, name: &str, path: &SearchPath) -> Option<Arc<dyn ServiceHandler>>;
}

/// Loads one module and resolves its entry point.
pub trait ModuleLoader: Send + Sync + 'static {
    /// Returns the handler exported as `symbol` by the module at `path`.
    fn load(&self, path: &str, symbol: &str) -> Option<Arc<dyn ServiceHandler>>;
}

/// Resolver that walks the search path candidates in order.
pub struct SearchPathResolver<L> {
    loader: L,
}

impl<L: ModuleLoader> SearchPathResolver<L> {
    /// Creates a resolver on top of `loader`.
    pub fn new(loader: L) -> Self {
        Self { loader }
    }
}

impl<L: ModuleLoader> ModuleResolver for SearchPathResolver<L> {
    fn resolve(&self, name: &str, path: &SearchPath) -> Option<Arc<dyn ServiceHandler>> {
        let symbol = SearchPath::entry_symbol(name);
        path.candidates(name).into_iter().find_map(|candidate| {
            let found = self.loader.load(&candidate, &symbol);
            tracing::trace!(candidate = %candidate, symbol = %symbol, found = found.is_some(), "module candidate");
            found
        })
    }
}

/// In-process module table: `path → (symbol → handler)`.
#[derive(Default)]
pub struct StaticLoader {
    modules: RwLock<HashMap<String, HashMap<String, Arc<dyn ServiceHandler>>>>,
}

impl StaticLoader {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exports `handler` as the entry point of service `name` in the module at `path`.
    pub fn export(&self, path: &str, name: &str, handler: Arc<dyn ServiceHandler>) {
        self.modules
            .write()
            .entry(path.to_string())
            .or_default()
            .insert(SearchPath::entry_symbol(name), handler);
    }
}

impl ModuleLoader for StaticLoader {
    fn load(&self, path: &str, symbol: &str) -> Option<Arc<dyn ServiceHandler>> {
        self.modules.read().get(path)?.get(symbol).cloned()
    }
}

impl<L: ModuleLoader> ModuleLoader for Arc<L> {
    fn load(&self, path: &str, symbol: &str) -> Option<Arc<dyn ServiceHandler>> {
        self.as_ref().load(path, symbol)
    }
}
