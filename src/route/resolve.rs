//! Route resolution.
//!
//! # Responsibilities
//! - Walk the route tree for a logical path and HTTP method
//! - Prefer literal children over pattern children at every level
//! - Report method-not-allowed, forbidden and index facts distinctly
//! - Verify the matched entry still exists on disk
//!
//! # Design Decisions
//! - Resolution is a pure read of the tree snapshot; it never mutates
//! - A dispatch token as the final segment resolves through the dispatch
//!   table when the method is satisfied and reports forbidden otherwise
//! - A vanished backing file is an index-corruption error, never a 404:
//!   it means the surgeon and the filesystem have desynced

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::Method;

use crate::error::ArborError;
use crate::handler::Handler;
use crate::route::node::{RouteTable, TreeNode};
use crate::route::segment::is_dispatch_token;

/// What a resolved path points at.
#[derive(Clone)]
pub enum Target {
    Handler(Arc<dyn Handler>),
    Static(PathBuf),
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Handler(_) => write!(f, "Handler(..)"),
            Target::Static(p) => write!(f, "Static({:?})", p),
        }
    }
}

/// Ephemeral result of resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolvedRoute {
    /// Filesystem path relative to the base path, e.g. `www/a/b.njs`.
    pub raw_path: String,
    pub params: HashMap<String, String>,
    pub target: Option<Target>,
    pub allowed_methods: Vec<Method>,
    pub has_index: bool,
    pub forbidden: bool,
    pub method_not_allowed: bool,
}

impl ResolvedRoute {
    pub fn is_found(&self) -> bool {
        self.target.is_some()
    }

    fn not_found(raw_path: String) -> Self {
        Self {
            raw_path,
            ..Self::default()
        }
    }
}

/// Resolve a logical path (`www/a/b`) and method against the tree.
///
/// The first segment selects the base tree; an unplanted base is a
/// `NotPlanted` error. Everything else is reported through the returned
/// route's flags, except index corruption which is fatal.
pub fn resolve(
    table: &RouteTable,
    base_path: &Path,
    path: &str,
    method: &Method,
) -> Result<ResolvedRoute, ArborError> {
    let trimmed = path.trim_start_matches('/');
    let segs: Vec<&str> = if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    };
    let Some(base) = segs.first() else {
        return Err(ArborError::NotPlanted(path.to_string()));
    };
    let root = table
        .root(base)
        .ok_or_else(|| ArborError::NotPlanted((*base).to_string()))?;

    let mut node = root;
    let mut raw = (*base).to_string();
    let mut params = HashMap::new();

    let rest = &segs[1..];
    if rest.is_empty() {
        return finalize_index(node, raw, params, base_path);
    }

    for (i, seg) in rest.iter().enumerate() {
        let last = i == rest.len() - 1;

        if seg.is_empty() {
            // Trailing slash: the directory's index or nothing.
            if !last {
                return Ok(ResolvedRoute::not_found(raw));
            }
            return finalize_index(node, raw, params, base_path);
        }

        // Direct addressing of a dispatch file goes through the dispatch
        // table: satisfied methods route normally, the rest are forbidden.
        if last && is_dispatch_token(seg) {
            if let Some(handlers) = &node.method_handlers {
                let allowed = sorted_methods(handlers.keys());
                if let Some(key) = handlers.get(method) {
                    let child = node.literal(key).ok_or_else(|| {
                        ArborError::IndexCorruption {
                            raw_path: format!("{}/{}", raw, key),
                        }
                    })?;
                    raw.push('/');
                    raw.push_str(&child.entry_name);
                    let mut route = finalize_leaf(child, raw, params, base_path)?;
                    route.allowed_methods = allowed;
                    return Ok(route);
                }
                return Ok(ResolvedRoute {
                    raw_path: raw,
                    allowed_methods: allowed,
                    forbidden: true,
                    ..ResolvedRoute::default()
                });
            }
        }

        let mut matched: Option<&TreeNode> = node.literal(seg);
        if matched.is_none() {
            for dynamic in &node.dynamic_children {
                if let Some(caps) = dynamic.matcher.captures(seg) {
                    for (pi, name) in dynamic.params.iter().enumerate() {
                        params.insert(name.clone(), caps[pi + 1].to_string());
                    }
                    matched = Some(&dynamic.node);
                    break;
                }
            }
        }
        let Some(child) = matched else {
            return Ok(ResolvedRoute::not_found(raw));
        };

        raw.push('/');
        raw.push_str(&child.entry_name);

        if last {
            return finalize_match(child, raw, params, method, base_path);
        }
        if !child.is_directory {
            return Ok(ResolvedRoute::not_found(raw));
        }
        node = child;
    }

    Ok(ResolvedRoute::not_found(raw))
}

/// Final segment landed on this node: dispatch by method, fall back to
/// the index, or take the leaf itself.
fn finalize_match(
    node: &TreeNode,
    raw: String,
    params: HashMap<String, String>,
    method: &Method,
    base_path: &Path,
) -> Result<ResolvedRoute, ArborError> {
    if !node.is_directory {
        return finalize_leaf(node, raw, params, base_path);
    }

    let has_index = node.index.is_some();

    if let Some(handlers) = &node.method_handlers {
        let allowed = sorted_methods(handlers.keys());
        if let Some(key) = handlers.get(method) {
            let child = node
                .literal(key)
                .ok_or_else(|| ArborError::IndexCorruption {
                    raw_path: format!("{}/{}", raw, key),
                })?;
            let mut raw = raw;
            raw.push('/');
            raw.push_str(&child.entry_name);
            let mut route = finalize_leaf(child, raw, params, base_path)?;
            route.allowed_methods = allowed;
            route.has_index = has_index;
            return Ok(route);
        }
        return Ok(ResolvedRoute {
            raw_path: raw,
            params,
            allowed_methods: allowed,
            has_index,
            method_not_allowed: true,
            ..ResolvedRoute::default()
        });
    }

    finalize_index(node, raw, params, base_path)
}

/// Resolve a directory to its index file, or report not-found.
fn finalize_index(
    node: &TreeNode,
    raw: String,
    params: HashMap<String, String>,
    base_path: &Path,
) -> Result<ResolvedRoute, ArborError> {
    let Some(index_key) = &node.index else {
        return Ok(ResolvedRoute::not_found(raw));
    };
    let child = node
        .literal(index_key)
        .ok_or_else(|| ArborError::IndexCorruption {
            raw_path: format!("{}/{}", raw, index_key),
        })?;
    let mut raw = raw;
    raw.push('/');
    raw.push_str(&child.entry_name);
    let mut route = finalize_leaf(child, raw, params, base_path)?;
    route.has_index = true;
    Ok(route)
}

fn finalize_leaf(
    node: &TreeNode,
    raw: String,
    params: HashMap<String, String>,
    base_path: &Path,
) -> Result<ResolvedRoute, ArborError> {
    // Liveness check: the tree said this entry exists; the disk must
    // agree or the surgeon has failed to keep the index consistent.
    let abs = base_path.join(&raw);
    if !abs.is_file() {
        return Err(ArborError::IndexCorruption { raw_path: raw });
    }

    let target = match &node.handler {
        Some(handler) => Target::Handler(handler.clone()),
        None => Target::Static(abs),
    };
    Ok(ResolvedRoute {
        raw_path: raw,
        params,
        target: Some(target),
        ..ResolvedRoute::default()
    })
}

fn sorted_methods<'a>(methods: impl Iterator<Item = &'a Method>) -> Vec<Method> {
    let mut out: Vec<Method> = methods.cloned().collect();
    out.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    out
}
