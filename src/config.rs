//! Environment-variable resolution, performed once at lifecycle
//! init instead of at finalize as the original runtime does, since nothing
//! here depends on data only known at program termination.

use std::path::PathBuf;

use crate::shadow::ShadowBackend;

const DEFAULT_DOT_DISCOPOP: &str = ".discopop";

#[derive(Debug, Clone)]
pub struct Config {
    pub dot_discopop: PathBuf,
    pub dot_discopop_profiler: PathBuf,
    pub num_workers: usize,
    pub pthread_compat: bool,
    pub shadow_backend: ShadowBackend,
}

impl Config {
    /// Resolves every setting from the environment, falling back to the
    /// documented defaults.
    pub fn from_env() -> Self {
        let dot_discopop = std::env::var_os("DOT_DISCOPOP")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOT_DISCOPOP));
        let dot_discopop_profiler = std::env::var_os("DOT_DISCOPOP_PROFILER")
            .map(PathBuf::from)
            .unwrap_or_else(|| dot_discopop.join("profiler"));
        let num_workers = std::env::var("DP_NUM_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_num_workers);
        let pthread_compat = std::env::var_os("DP_PTHREAD_COMPATIBILITY_MODE").is_some();
        let shadow_backend = match std::env::var("DP_SHADOW_BACKEND").as_deref() {
            Ok("dense") => ShadowBackend::Dense,
            _ => ShadowBackend::Sparse,
        };

        Config {
            dot_discopop,
            dot_discopop_profiler,
            num_workers,
            pthread_compat,
            shadow_backend,
        }
    }
}

fn default_num_workers() -> usize {
    num_cpus::get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiler_dir_derives_from_root_by_default() {
        std::env::remove_var("DOT_DISCOPOP");
        std::env::remove_var("DOT_DISCOPOP_PROFILER");
        let cfg = Config::from_env();
        assert_eq!(cfg.dot_discopop, PathBuf::from(DEFAULT_DOT_DISCOPOP));
        assert_eq!(cfg.dot_discopop_profiler, PathBuf::from(".discopop/profiler"));
    }
}
