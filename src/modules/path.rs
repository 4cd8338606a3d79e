//! # Module search path.
//!
//! A search path is a `;`-separated list of templates. Each `?` in a template
//! is replaced by the requested service name:
//!
//! ```text
//! "services/?.so;../services/?.so;./?.so"  +  "net.echo"
//!   ─► services/net.echo.so
//!   ─► ../services/net.echo.so
//!   ─► ./net.echo.so
//! ```
//!
//! The entry point of a module is the exported symbol [`ENTRY_PREFIX`] followed
//! by the service name with every `.` replaced by `_` (`slotvisor_service_net_echo`).

use std::fmt;

/// Prefix of the exported entry-point symbol of a service module.
pub const ENTRY_PREFIX: &str = "slotvisor_service_";

/// Default search templates for this platform.
#[cfg(windows)]
pub const DEFAULT_SEARCH_PATH: &str = "!\\services\\?.dll;!\\..\\services\\?.dll;!\\?.dll";

/// Default search templates for this platform.
#[cfg(not(windows))]
pub const DEFAULT_SEARCH_PATH: &str = "services/?.so;../services/?.so;./?.so";

/// Ordered list of module path templates.
#[derive(Clone, PartialEq, Eq)]
pub struct SearchPath {
    templates: Vec<String>,
}

impl SearchPath {
    /// Parses a `;`-separated template list; empty segments are skipped.
    pub fn parse(spec: &str) -> Self {
        let mut path = Self {
            templates: Vec::new(),
        };
        path.push(spec);
        path
    }

    /// Appends more templates after the existing ones.
    pub fn push(&mut self, spec: &str) {
        self.templates.extend(
            spec.split(';')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        );
    }

    /// Templates in search order.
    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    /// Candidate module paths for `name`, in search order.
    ///
    /// # Example
    /// ```
    /// use slotvisor::SearchPath;
    ///
    /// let path = SearchPath::parse("lib/?.so;?.so");
    /// assert_eq!(path.candidates("echo"), vec!["lib/echo.so", "echo.so"]);
    /// ```
    pub fn candidates(&self, name: &str) -> Vec<String> {
        self.templates.iter().map(|t| t.replace('?', name)).collect()
    }

    /// Entry-point symbol for `name`.
    ///
    /// # Example
    /// ```
    /// use slotvisor::SearchPath;
    ///
    /// assert_eq!(SearchPath::entry_symbol("net.echo"), "slotvisor_service_net_echo");
    /// ```
    pub fn entry_symbol(name: &str) -> String {
        let mut symbol = String::with_capacity(ENTRY_PREFIX.len() + name.len());
        symbol.push_str(ENTRY_PREFIX);
        symbol.extend(name.chars().map(|c| if c == '.' { '_' } else { c }));
        symbol
    }
}

impl Default for SearchPath {
    fn default() -> Self {
        Self::parse(DEFAULT_SEARCH_PATH)
    }
}

impl fmt::Debug for SearchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.templates.join(";"))
    }
}
