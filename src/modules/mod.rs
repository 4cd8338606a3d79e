//! Service modules: search-path templates and name resolution.
//!
//! ## Contents
//! - [`SearchPath`] `;`-separated templates with a `?` wildcard
//! - [`ModuleResolver`] name → startup handler lookup used by `require`
//! - [`ModuleLoader`], [`SearchPathResolver`], [`StaticLoader`] building blocks

mod path;
mod resolver;

pub use path::{DEFAULT_SEARCH_PATH, ENTRY_PREFIX, SearchPath};
pub use resolver::{ModuleLoader, ModuleResolver, SearchPathResolver, StaticLoader};
