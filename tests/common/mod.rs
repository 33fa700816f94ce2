//! Shared utilities for integration testing.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use arbor::config::ArborConfig;

static TREE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A throwaway content directory, removed on drop.
pub struct TempTree {
    pub base: PathBuf,
}

impl TempTree {
    /// Create a fresh base directory with empty `www` and `error` roots.
    pub fn new() -> Self {
        let id = TREE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let base = std::env::temp_dir().join(format!(
            "arbor-test-{}-{}",
            std::process::id(),
            id
        ));
        std::fs::create_dir_all(base.join("www")).unwrap();
        std::fs::create_dir_all(base.join("error")).unwrap();
        Self { base }
    }

    /// Write a file relative to the base, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.base.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[allow(dead_code)]
    pub fn exists(&self, rel: &str) -> bool {
        self.base.join(rel).exists()
    }

    #[allow(dead_code)]
    pub fn path(&self, rel: &str) -> PathBuf {
        self.base.join(rel)
    }
}

impl Drop for TempTree {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.base);
    }
}

/// Configuration pointed at a temp tree, caching on, sync off.
pub fn test_config(base: &Path) -> ArborConfig {
    let mut config = ArborConfig::default();
    config.content.base_path = base.to_string_lossy().into_owned();
    config.cache.enabled = true;
    config.cache.handler_timeout_secs = 2;
    config
}
