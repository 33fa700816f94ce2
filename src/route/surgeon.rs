//! Tree surgeon: incremental single-path removal and re-insertion.
//!
//! # Responsibilities
//! - `limb`: remove one fully-resolved path, purge its cache entries,
//!   prune now-empty ancestor directories
//! - `replant`: re-create one path, replacing any existing node
//!
//! # Design Decisions
//! - Paths are addressed by on-disk entry names (`www/a/b.njs`)
//! - Mutation is synchronous: no suspension point exists between the
//!   first node removal and the tree reaching its consistent state
//! - Cache purge happens in the same call, before the node is unlinked,
//!   so a purged path can never serve a stale cached response
//! - `limb` then `replant` of one path reproduces what a full rebuild
//!   restricted to that path would build

use std::path::Path;

use crate::error::ArborError;
use crate::handler::{HandlerRegistry, LoadCache};
use crate::route::node::{RouteTable, TreeNode};
use crate::route::plant::{attach_directory, attach_file};
use crate::route::segment::Naming;

/// Remove a single path from the tree, purging its cache entries.
///
/// The path must name every on-disk segment down to the leaf; a missing
/// segment is a `NotPlanted` error and leaves the tree untouched.
pub fn limb(table: &mut RouteTable, cache: &LoadCache, path: &str) -> Result<(), ArborError> {
    let segs = entry_segments(path)?;
    if segs.len() < 2 {
        // Base directories are planted at startup and never limbed.
        return Err(ArborError::NotPlanted(path.to_string()));
    }
    let root = table
        .root_mut(segs[0])
        .ok_or_else(|| ArborError::NotPlanted(path.to_string()))?;

    // Verify the full chain exists before touching anything.
    ensure_planted(root, &segs[1..], path)?;

    limb_rec(root, &segs[1..], path, cache);
    tracing::debug!(path = path, "Limbed path");
    Ok(())
}

fn ensure_planted(node: &TreeNode, segs: &[&str], full_path: &str) -> Result<(), ArborError> {
    let mut cur = node;
    for seg in segs {
        let slot = cur
            .child_key_by_entry(seg)
            .ok_or_else(|| ArborError::NotPlanted(full_path.to_string()))?;
        cur = cur
            .child_by_slot(&slot)
            .ok_or_else(|| ArborError::NotPlanted(full_path.to_string()))?;
    }
    Ok(())
}

fn limb_rec(node: &mut TreeNode, segs: &[&str], full_path: &str, cache: &LoadCache) {
    // ensure_planted ran first; every lookup below succeeds.
    let Some(slot) = node.child_key_by_entry(segs[0]) else {
        return;
    };

    if segs.len() == 1 {
        let was_directory = node
            .child_by_slot(&slot)
            .map(|c| c.is_directory)
            .unwrap_or(false);
        cache.purge(full_path);
        if was_directory {
            cache.purge_prefix(&format!("{}/", full_path));
        }
        node.remove_child(&slot);
        return;
    }

    if let Some(child) = node.child_by_slot_mut(&slot) {
        limb_rec(child, &segs[1..], full_path, cache);
    }

    // Prune-until-nonempty: a directory emptied by the removal goes too;
    // one with surviving descendants ends the unwind.
    let prune = node
        .child_by_slot(&slot)
        .map(|c| c.is_directory && !c.has_live_children())
        .unwrap_or(false);
    if prune {
        node.remove_child(&slot);
    }
}

/// Re-create a single path from its on-disk file, replacing any node the
/// path currently resolves to (delete then recreate).
pub fn replant(
    table: &mut RouteTable,
    cache: &LoadCache,
    base_path: &Path,
    path: &str,
    naming: &Naming,
    registry: &HandlerRegistry,
) -> Result<(), ArborError> {
    let segs = entry_segments(path)?;
    if segs.len() < 2 {
        return Err(ArborError::NotPlanted(path.to_string()));
    }
    {
        let root = table
            .root(segs[0])
            .ok_or_else(|| ArborError::NotPlanted(path.to_string()))?;
        if ensure_planted(root, &segs[1..], path).is_ok() {
            limb(table, cache, path)?;
        }
    }

    let root = table
        .root_mut(segs[0])
        .ok_or_else(|| ArborError::NotPlanted(path.to_string()))?;
    let dir = base_path.join(segs[0]);
    replant_rec(root, &segs[1..], &dir, segs[0], naming, registry)?;
    tracing::debug!(path = path, "Replanted path");
    Ok(())
}

fn replant_rec(
    node: &mut TreeNode,
    segs: &[&str],
    dir: &Path,
    rel: &str,
    naming: &Naming,
    registry: &HandlerRegistry,
) -> Result<(), ArborError> {
    let seg = segs[0];
    let child_rel = format!("{}/{}", rel, seg);
    let child_abs = dir.join(seg);

    if segs.len() == 1 {
        if !child_abs.is_file() {
            return Err(ArborError::NotPlanted(format!(
                "{} is not a file on disk",
                child_rel
            )));
        }
        return attach_file(node, seg, &child_abs, &child_rel, naming, registry);
    }

    if node.child_key_by_entry(seg).is_none() {
        attach_directory(node, seg, TreeNode::directory(seg))?;
    }
    let slot = node
        .child_key_by_entry(seg)
        .ok_or_else(|| ArborError::NotPlanted(child_rel.clone()))?;
    let child = node
        .child_by_slot_mut(&slot)
        .ok_or_else(|| ArborError::NotPlanted(child_rel.clone()))?;
    if !child.is_directory {
        return Err(ArborError::Configuration(format!(
            "{} is a file but the replanted path descends through it",
            child_rel
        )));
    }
    replant_rec(child, &segs[1..], &child_abs, &child_rel, naming, registry)
}

fn entry_segments(path: &str) -> Result<Vec<&str>, ArborError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(ArborError::NotPlanted(path.to_string()));
    }
    Ok(trimmed.split('/').collect())
}
