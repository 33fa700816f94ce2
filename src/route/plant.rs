//! Tree builder: full recursive construction of a route tree from disk.
//!
//! # Responsibilities
//! - Walk a base directory and classify every entry
//! - Compile dynamic handler files through the registry, fail-fast
//! - Register index, method-dispatch and catch-all children
//!
//! # Design Decisions
//! - Directory scans are sorted so planting is deterministic
//! - Pattern children are kept in lexicographic key order; replanting a
//!   single path therefore reproduces exactly what a full rebuild would
//! - A page file shadows a same-named directory; the collision is logged
//! - `ALL` files claim methods only after sibling method lists have
//!   claimed theirs

use std::path::Path;
use std::sync::Arc;

use axum::http::Method;

use crate::error::ArborError;
use crate::handler::{Handler, HandlerRegistry};
use crate::route::node::{DynamicChild, TreeNode};
use crate::route::segment::{classify_file, classify_segment, Naming, SegmentKind};

const ALL_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
];

/// Build the route tree for one base directory.
pub fn plant(
    base_path: &Path,
    root_name: &str,
    naming: &Naming,
    registry: &HandlerRegistry,
) -> Result<TreeNode, ArborError> {
    let dir = base_path.join(root_name);
    if !dir.is_dir() {
        return Err(ArborError::Configuration(format!(
            "base directory {:?} does not exist",
            dir
        )));
    }
    let mut root = TreeNode::directory(root_name);
    plant_directory(&mut root, &dir, root_name, naming, registry)?;
    tracing::debug!(root = root_name, "Planted base directory");
    Ok(root)
}

fn plant_directory(
    node: &mut TreeNode,
    dir: &Path,
    rel: &str,
    naming: &Naming,
    registry: &HandlerRegistry,
) -> Result<(), ArborError> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() {
            dirs.push(name);
        } else {
            files.push(name);
        }
    }
    dirs.sort();
    files.sort();

    for name in dirs {
        let child_rel = format!("{}/{}", rel, name);
        let mut child = TreeNode::directory(&name);
        plant_directory(&mut child, &dir.join(&name), &child_rel, naming, registry)?;
        attach_directory(node, &name, child)?;
    }

    // Catch-all files claim methods left over by sibling method lists,
    // so they must be attached after every other file.
    let mut catch_all = None;
    for name in files {
        if matches!(classify_file(&name, naming)?, SegmentKind::CatchAll) {
            catch_all = Some(name);
            continue;
        }
        let child_rel = format!("{}/{}", rel, name);
        attach_file(node, &name, &dir.join(&name), &child_rel, naming, registry)?;
    }
    if let Some(name) = catch_all {
        let child_rel = format!("{}/{}", rel, name);
        attach_file(node, &name, &dir.join(&name), &child_rel, naming, registry)?;
    }

    Ok(())
}

/// Attach an already-built directory node under its parent.
pub(crate) fn attach_directory(
    parent: &mut TreeNode,
    name: &str,
    child: TreeNode,
) -> Result<(), ArborError> {
    match classify_segment(name)? {
        SegmentKind::Pattern { params, matcher } => {
            insert_dynamic(
                parent,
                DynamicChild {
                    key: name.to_string(),
                    params,
                    matcher,
                    node: child,
                },
            );
        }
        _ => {
            if parent.children.contains_key(name) {
                tracing::warn!(segment = name, "Directory shadowed by an existing entry");
                return Ok(());
            }
            parent.children.insert(name.to_string(), child);
        }
    }
    Ok(())
}

/// Classify one file entry and attach it under its parent directory node.
/// Shared by the full builder and the surgeon's replant.
pub(crate) fn attach_file(
    parent: &mut TreeNode,
    file_name: &str,
    abs_path: &Path,
    rel_path: &str,
    naming: &Naming,
    registry: &HandlerRegistry,
) -> Result<(), ArborError> {
    let handler = compile_if_dynamic(file_name, abs_path, rel_path, naming, registry)?;
    let key = naming.route_key(file_name).to_string();

    match classify_file(file_name, naming)? {
        SegmentKind::Index => {
            insert_literal(parent, &key, TreeNode::file(file_name, handler));
            if let Some(existing) = &parent.index {
                if existing != &key {
                    tracing::warn!(
                        kept = %existing,
                        ignored = %key,
                        "Multiple index files in one directory; keeping the first"
                    );
                    return Ok(());
                }
            }
            parent.index = Some(key);
        }
        SegmentKind::MethodDispatch(methods) => {
            let handlers = parent.method_handlers.get_or_insert_with(Default::default);
            // Claims held by a catch-all yield to an explicit method list.
            for method in &methods {
                if handlers.get(method).is_some_and(|k| k != "ALL") {
                    return Err(ArborError::Configuration(format!(
                        "{}: method {} is already claimed by another dispatch file",
                        rel_path, method
                    )));
                }
            }
            for method in methods {
                handlers.insert(method, key.clone());
            }
            insert_literal(parent, &key, TreeNode::file(file_name, handler));
        }
        SegmentKind::CatchAll => {
            let handlers = parent.method_handlers.get_or_insert_with(Default::default);
            for method in ALL_METHODS {
                handlers.entry(method).or_insert_with(|| key.clone());
            }
            insert_literal(parent, &key, TreeNode::file(file_name, handler));
        }
        SegmentKind::Pattern { params, matcher } => {
            insert_dynamic(
                parent,
                DynamicChild {
                    key,
                    params,
                    matcher,
                    node: TreeNode::file(file_name, handler),
                },
            );
        }
        SegmentKind::Literal(key) => {
            insert_literal(parent, &key, TreeNode::file(file_name, handler));
        }
    }
    Ok(())
}

fn compile_if_dynamic(
    file_name: &str,
    abs_path: &Path,
    rel_path: &str,
    naming: &Naming,
    registry: &HandlerRegistry,
) -> Result<Option<Arc<dyn Handler>>, ArborError> {
    if !naming.is_handler(file_name) {
        return Ok(None);
    }
    let source = std::fs::read_to_string(abs_path)?;
    let handler = registry.resolve(rel_path, &source)?;
    Ok(Some(handler))
}

fn insert_literal(parent: &mut TreeNode, key: &str, node: TreeNode) {
    if let Some(existing) = parent.children.get(key) {
        if existing.is_directory {
            tracing::warn!(segment = key, "Page file shadows a same-named directory");
        }
    }
    parent.children.insert(key.to_string(), node);
}

fn insert_dynamic(parent: &mut TreeNode, child: DynamicChild) {
    let pos = parent
        .dynamic_children
        .binary_search_by(|d| d.key.cmp(&child.key))
        .unwrap_or_else(|i| i);
    match parent.dynamic_children.get(pos) {
        Some(existing) if existing.key == child.key => {
            if existing.node.is_directory && !child.node.is_directory {
                tracing::warn!(
                    segment = %child.key,
                    "Pattern file shadows a same-named pattern directory"
                );
            }
            parent.dynamic_children[pos] = child;
        }
        _ => parent.dynamic_children.insert(pos, child),
    }
}
