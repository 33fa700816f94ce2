//! Server state: the explicit owner of route trees, cache and options.
//!
//! # Responsibilities
//! - Plant every configured base directory at startup (fail-fast)
//! - Hand the resolver a consistent tree snapshot per request
//! - Serialize surgeon mutations behind a single write lock
//!
//! # Design Decisions
//! - Tree reads take a shared lock; limb/replant take the write lock and
//!   mutate synchronously, so no request ever observes a half-surgered
//!   tree
//! - Cache purges happen inside the surgeon call, under the same lock
//!   acquisition as the tree mutation

use std::collections::HashMap;
use std::path::PathBuf;

use axum::http::Method;
use tokio::sync::RwLock;

use crate::config::ArborConfig;
use crate::error::ArborError;
use crate::handler::{Context, HandlerRegistry, LoadCache};
use crate::pipeline::Pipeline;
use crate::route::node::RouteTable;
use crate::route::{path, plant, resolve, surgeon, Naming, ResolvedRoute};

/// Process-wide serving state.
pub struct Arbor {
    pub config: ArborConfig,
    pub naming: Naming,
    pub base_path: PathBuf,
    pub tree: RwLock<RouteTable>,
    pub cache: LoadCache,
    pub registry: HandlerRegistry,
    pub pipeline: Pipeline,
}

impl Arbor {
    /// Plant every configured base directory and assemble the state.
    /// Any classification or compilation failure aborts startup.
    pub fn new(config: ArborConfig, registry: HandlerRegistry) -> Result<Self, ArborError> {
        let naming = Naming::from_config(&config.content);
        let base_path = PathBuf::from(&config.content.base_path);
        let pipeline = Pipeline::new(&config.content);

        let mut roots = HashMap::new();
        for root in &config.content.roots {
            let tree = plant::plant(&base_path, root, &naming, &registry)?;
            roots.insert(root.clone(), tree);
        }
        tracing::info!(roots = roots.len(), "Route trees planted");

        Ok(Self {
            cache: LoadCache::new(config.cache.enabled),
            tree: RwLock::new(RouteTable { roots }),
            naming,
            base_path,
            registry,
            pipeline,
            config,
        })
    }

    /// Canonicalize a raw URL path.
    pub fn normalize(&self, raw: &str) -> String {
        path::normalize(raw, &self.config.content.page_extensions())
    }

    /// Resolve a logical path (`www/a/b`) and method against the current
    /// tree snapshot.
    pub async fn resolve(&self, path: &str, method: &Method) -> Result<ResolvedRoute, ArborError> {
        let table = self.tree.read().await;
        resolve::resolve(&table, &self.base_path, path, method)
    }

    /// Resolve and execute, going through the load cache.
    pub async fn load(&self, path: &str, caller: &Context) -> Result<Context, ArborError> {
        crate::handler::load(self, path, caller).await
    }

    /// Surgically remove one path and purge its cache entries.
    pub async fn limb(&self, path: &str) -> Result<(), ArborError> {
        let mut table = self.tree.write().await;
        surgeon::limb(&mut table, &self.cache, path)
    }

    /// Re-create one path from disk, replacing any existing node.
    pub async fn replant(&self, path: &str) -> Result<(), ArborError> {
        let mut table = self.tree.write().await;
        surgeon::replant(
            &mut table,
            &self.cache,
            &self.base_path,
            path,
            &self.naming,
            &self.registry,
        )
    }
}
