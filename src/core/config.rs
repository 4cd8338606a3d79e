//! # Runtime configuration.
//!
//! Provides [`RuntimeConfig`] centralized settings for one runtime instance.
//!
//! Config is used in two ways:
//! 1. **Runtime creation**: `Runtime::new(config)` / `RuntimeBuilder::new(config)`
//! 2. **Before start**: `set_threads` / `add_search_path` adjust the live copy until
//!    [`Runtime::start`](crate::Runtime::start) is called.
//!
//! ## Sentinel values
//! - `threads = 0` → detect the CPU count
//! - `node_pool_capacity = 0` → never recycle signal nodes

use crate::modules::SearchPath;

/// Hard cap on the number of pool workers.
pub const MAX_THREADS: usize = 32;

/// Maximum length of a service name in bytes.
pub const MAX_SERVICE_NAME: usize = 32;

/// Maximum length of a qualified slot name in bytes.
pub const MAX_SLOT_NAME: usize = 63;

/// Configuration of one runtime instance.
///
/// ## Field semantics
/// - `name`: name of the root service (also the prefix of root-owned slots)
/// - `threads`: worker pool size (`0` = CPU count), capped at [`MAX_THREADS`]
/// - `search_path`: module templates handed to the resolver
/// - `node_pool_capacity`: maximum number of idle signal nodes kept for reuse
/// - `thread_name_prefix`: prefix of worker and poll thread names
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Name of the root service.
    pub name: String,

    /// Number of pool workers to spawn on start.
    ///
    /// - `0` = one per available CPU
    /// - `n > 0` = exactly `n` (at most [`MAX_THREADS`])
    pub threads: usize,

    /// Module search templates (`;`-separated, `?` is the service name).
    pub search_path: SearchPath,

    /// Maximum number of recycled signal nodes kept by the pool.
    pub node_pool_capacity: usize,

    /// Prefix for OS thread names (`{prefix}-worker-{i}`, `{prefix}-poll`).
    pub thread_name_prefix: String,
}

impl RuntimeConfig {
    /// Returns the number of workers `start` will try to spawn.
    ///
    /// Resolves the `0` sentinel to the detected CPU count and applies the
    /// [`MAX_THREADS`] cap.
    #[inline]
    pub fn worker_threads(&self) -> usize {
        let n = if self.threads == 0 {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            self.threads
        };
        n.clamp(1, MAX_THREADS)
    }

    /// Returns the thread name prefix, falling back to the root service name.
    #[inline]
    pub fn thread_prefix(&self) -> &str {
        if self.thread_name_prefix.is_empty() {
            &self.name
        } else {
            &self.thread_name_prefix
        }
    }
}

impl Default for RuntimeConfig {
    /// Default configuration:
    ///
    /// - `name = "root"`
    /// - `threads = 0` (CPU count)
    /// - `search_path` = platform default templates
    /// - `node_pool_capacity = 1024`
    /// - `thread_name_prefix = "slotvisor"`
    fn default() -> Self {
        Self {
            name: "root".to_string(),
            threads: 0,
            search_path: SearchPath::default(),
            node_pool_capacity: 1024,
            thread_name_prefix: "slotvisor".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_thread_count_is_capped() {
        let cfg = RuntimeConfig {
            threads: 500,
            ..RuntimeConfig::default()
        };
        assert_eq!(cfg.worker_threads(), MAX_THREADS);
    }

    #[test]
    fn zero_threads_detects_cpus() {
        let cfg = RuntimeConfig::default();
        let n = cfg.worker_threads();
        assert!((1..=MAX_THREADS).contains(&n));
    }

    #[test]
    fn empty_prefix_falls_back_to_root_name() {
        let cfg = RuntimeConfig {
            name: "app".into(),
            thread_name_prefix: String::new(),
            ..RuntimeConfig::default()
        };
        assert_eq!(cfg.thread_prefix(), "app");
    }
}
