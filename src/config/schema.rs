//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the content server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ArborConfig {
    /// Listener and timeout settings.
    pub server: ServerConfig,

    /// Content roots and file-naming conventions.
    pub content: ContentConfig,

    /// Handler cache settings.
    pub cache: CacheConfig,

    /// Webhook synchronization settings.
    pub sync: SyncConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Content root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Directory under which all base directories live.
    pub base_path: String,

    /// Base directories to plant as independent route trees.
    /// The first entry is the public root; "error" holds status pages.
    pub roots: Vec<String>,

    /// Extension marking dynamic handler files.
    pub handler_extension: String,

    /// Extensions treated as static markup pages.
    pub markup_extensions: Vec<String>,

    /// Replant paths when their backing files change on disk.
    pub watch_local_changes: bool,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            base_path: ".".to_string(),
            roots: vec!["www".to_string(), "error".to_string()],
            handler_extension: "njs".to_string(),
            markup_extensions: vec!["html".to_string(), "htm".to_string()],
            watch_local_changes: false,
        }
    }
}

impl ContentConfig {
    /// All extensions the path normalizer strips from public paths.
    pub fn page_extensions(&self) -> Vec<String> {
        let mut exts = vec![self.handler_extension.clone()];
        exts.extend(self.markup_extensions.iter().cloned());
        exts
    }
}

/// Handler cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the load cache.
    pub enabled: bool,

    /// Seconds a handler may run before its completion is abandoned.
    pub handler_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            handler_timeout_secs: 30,
        }
    }
}

/// Webhook synchronization configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Enable webhook-driven synchronization.
    pub enabled: bool,

    /// Shared secret for payload signature verification.
    pub secret: String,

    /// API token for authenticated content fetches, if the repository
    /// is private.
    pub token: Option<String>,

    /// Branch whose pushes are applied; others are acknowledged and ignored.
    pub branch: String,

    /// URL path the webhook posts to.
    pub payload_path: String,

    /// Repository manifest file; a change triggers install + restart.
    pub manifest_file: String,

    /// Server entrypoint file; a change triggers restart.
    pub entrypoint_file: String,

    /// Command run before restarting when the manifest changed.
    pub install_command: Vec<String>,

    /// Fetch retry attempts per file.
    pub fetch_attempts: u32,

    /// Base delay for fetch retry backoff in milliseconds.
    pub fetch_base_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            secret: String::new(),
            token: None,
            branch: "master".to_string(),
            payload_path: "/githubwebhook".to_string(),
            manifest_file: "package.json".to_string(),
            entrypoint_file: "server.js".to_string(),
            install_command: vec!["npm".to_string(), "update".to_string()],
            fetch_attempts: 3,
            fetch_base_delay_ms: 200,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
