//! Handler loader: executes resolved routes with caching.
//!
//! # Data Flow
//! ```text
//! load(path, caller ctx)
//!     → resolve against the tree
//!     → static file: raw bytes
//!     → handler: execution context (reserved fields scrubbed,
//!       raw_path/params injected)
//!         → vary lookup → cache hit: merged context, handler skipped
//!         → miss: invoke handler, await single-shot completion
//!         → completion with a cache directive persists the entry
//! ```
//!
//! # Design Decisions
//! - No request coalescing: concurrent misses may both run the handler
//! - A handler that never completes is cut off by a timeout instead of
//!   leaking the request
//! - The stored key is computed with the path's recorded strategy, so a
//!   later handler cannot change the vary function mid-flight

use std::time::Duration;

use crate::error::ArborError;
use crate::handler::cache::CacheStrategy;
use crate::handler::context::{CacheDirective, Context};
use crate::handler::registry::Completion;
use crate::observability::metrics;
use crate::route::{ResolvedRoute, Target};
use crate::server::Arbor;

/// Resolve a logical path and execute what it points at.
///
/// Fails with `NotPlanted` when the path does not resolve to a concrete
/// target (including method-not-allowed and forbidden outcomes; callers
/// that need those distinctions resolve first and use `load_resolved`).
pub async fn load(arbor: &Arbor, path: &str, caller: &Context) -> Result<Context, ArborError> {
    let resolved = arbor.resolve(path, &caller.method).await?;
    if !resolved.is_found() {
        return Err(ArborError::NotPlanted(path.to_string()));
    }
    load_resolved(arbor, &resolved, caller).await
}

/// Execute an already-resolved route.
pub async fn load_resolved(
    arbor: &Arbor,
    resolved: &ResolvedRoute,
    caller: &Context,
) -> Result<Context, ArborError> {
    let target = resolved
        .target
        .clone()
        .ok_or_else(|| ArborError::NotPlanted(resolved.raw_path.clone()))?;

    match target {
        Target::Static(abs) => {
            let bytes = tokio::fs::read(&abs).await?;
            let mut ctx = caller.for_execution(resolved.raw_path.clone(), resolved.params.clone());
            ctx.value = bytes;
            Ok(ctx)
        }
        Target::Handler(handler) => {
            let raw_path = resolved.raw_path.clone();
            let mut ctx = caller.for_execution(raw_path.clone(), resolved.params.clone());

            if let Some(strategy) = arbor.cache.strategy(&raw_path) {
                let key = vary_key(&strategy, &ctx);
                if let Some(entry) = arbor.cache.get(&raw_path, &key) {
                    metrics::record_cache_event(true);
                    tracing::debug!(raw_path = %raw_path, "Load cache hit");
                    ctx.apply_cached(&entry);
                    return Ok(ctx);
                }
            }
            metrics::record_cache_event(false);

            let (completion, rx) = Completion::new();
            handler.call(ctx, completion);

            let timeout_secs = arbor.config.cache.handler_timeout_secs;
            let completed = tokio::time::timeout(Duration::from_secs(timeout_secs), rx)
                .await
                .map_err(|_| ArborError::HandlerTimeout {
                    path: raw_path.clone(),
                    secs: timeout_secs,
                })?
                .map_err(|_| ArborError::HandlerExecution {
                    path: raw_path.clone(),
                    reason: "handler dropped its completion signal".to_string(),
                })?;
            let ctx = completed.map_err(|reason| ArborError::HandlerExecution {
                path: raw_path.clone(),
                reason,
            })?;

            if arbor.cache.enabled() {
                match &ctx.cache {
                    CacheDirective::Off => {}
                    CacheDirective::Unconditional => {
                        arbor
                            .cache
                            .set_strategy(&raw_path, CacheStrategy::Unconditional);
                        persist(arbor, &raw_path, &ctx);
                    }
                    CacheDirective::Vary(vary) => {
                        arbor
                            .cache
                            .set_strategy(&raw_path, CacheStrategy::Vary(vary.clone()));
                        persist(arbor, &raw_path, &ctx);
                    }
                }
            }

            Ok(ctx)
        }
    }
}

fn persist(arbor: &Arbor, raw_path: &str, ctx: &Context) {
    // First-writer-wins: key with the strategy actually recorded for the
    // path, which may predate this handler run.
    if let Some(strategy) = arbor.cache.strategy(raw_path) {
        let key = vary_key(&strategy, ctx);
        arbor.cache.store(raw_path, &key, ctx.to_cache_entry());
    }
}

fn vary_key(strategy: &CacheStrategy, ctx: &Context) -> String {
    match strategy {
        CacheStrategy::Unconditional => String::new(),
        CacheStrategy::Vary(vary) => vary(ctx),
    }
}
