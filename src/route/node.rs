//! Route tree node model.
//!
//! # Data Flow
//! ```text
//! base directory on disk
//!     → plant.rs (recursive walk, classify entries)
//!     → TreeNode trie (one node per path segment)
//!     → read by resolve.rs, mutated only by surgeon.rs
//! ```
//!
//! # Design Decisions
//! - Children are keyed by route key (page files lose their extension)
//! - Dynamic children are kept in key order; first match wins
//! - Every node remembers its on-disk entry name so resolution can
//!   reconstruct the raw filesystem path without re-walking the disk

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;
use regex::Regex;

use crate::handler::Handler;

/// One path segment: a directory or a file leaf.
#[derive(Clone)]
pub struct TreeNode {
    /// On-disk entry name (`b.njs`, `{id}`, `www`).
    pub entry_name: String,

    /// Literal children, keyed by route key.
    pub children: HashMap<String, TreeNode>,

    /// Pattern children, in declaration order.
    pub dynamic_children: Vec<DynamicChild>,

    /// Route key of the child acting as this directory's index file.
    pub index: Option<String>,

    /// Method-dispatch table: method → route key of the handling child.
    /// Present only on directories containing dispatch files.
    pub method_handlers: Option<HashMap<Method, String>>,

    /// Compiled handler, present only on dynamic file leaves.
    pub handler: Option<Arc<dyn Handler>>,

    pub is_directory: bool,
}

/// A child whose segment contains `{param}` placeholders.
#[derive(Clone)]
pub struct DynamicChild {
    /// Raw route key, e.g. `{id}`; used by the surgeon for removal.
    pub key: String,
    pub params: Vec<String>,
    pub matcher: Regex,
    pub node: TreeNode,
}

impl TreeNode {
    pub fn directory(entry_name: impl Into<String>) -> Self {
        Self {
            entry_name: entry_name.into(),
            children: HashMap::new(),
            dynamic_children: Vec::new(),
            index: None,
            method_handlers: None,
            handler: None,
            is_directory: true,
        }
    }

    pub fn file(entry_name: impl Into<String>, handler: Option<Arc<dyn Handler>>) -> Self {
        Self {
            entry_name: entry_name.into(),
            children: HashMap::new(),
            dynamic_children: Vec::new(),
            index: None,
            method_handlers: None,
            handler,
            is_directory: false,
        }
    }

    /// True while any literal or pattern child remains.
    pub fn has_live_children(&self) -> bool {
        !self.children.is_empty() || !self.dynamic_children.is_empty()
    }

    /// Look up a literal child by route key.
    pub fn literal(&self, key: &str) -> Option<&TreeNode> {
        self.children.get(key)
    }

    /// Find a child by its on-disk entry name, checking literal children
    /// first and pattern children in declaration order. Used by the
    /// surgeon, which addresses nodes by filesystem path.
    pub fn child_key_by_entry(&self, entry_name: &str) -> Option<ChildSlot> {
        for (key, child) in &self.children {
            if child.entry_name == entry_name {
                return Some(ChildSlot::Literal(key.clone()));
            }
        }
        self.dynamic_children
            .iter()
            .position(|d| d.node.entry_name == entry_name)
            .map(ChildSlot::Dynamic)
    }

    pub fn child_by_slot(&self, slot: &ChildSlot) -> Option<&TreeNode> {
        match slot {
            ChildSlot::Literal(key) => self.children.get(key),
            ChildSlot::Dynamic(i) => self.dynamic_children.get(*i).map(|d| &d.node),
        }
    }

    pub fn child_by_slot_mut(&mut self, slot: &ChildSlot) -> Option<&mut TreeNode> {
        match slot {
            ChildSlot::Literal(key) => self.children.get_mut(key),
            ChildSlot::Dynamic(i) => self.dynamic_children.get_mut(*i).map(|d| &mut d.node),
        }
    }

    /// Remove a child and repair this node's index and dispatch table.
    /// Returns the removed node.
    pub fn remove_child(&mut self, slot: &ChildSlot) -> Option<TreeNode> {
        let (key, removed) = match slot {
            ChildSlot::Literal(key) => (key.clone(), self.children.remove(key)?),
            ChildSlot::Dynamic(i) => {
                if *i >= self.dynamic_children.len() {
                    return None;
                }
                let d = self.dynamic_children.remove(*i);
                (d.key, d.node)
            }
        };

        if self.index.as_deref() == Some(key.as_str()) {
            self.index = None;
        }
        if let Some(handlers) = &mut self.method_handlers {
            handlers.retain(|_, v| v != &key);
            if handlers.is_empty() {
                self.method_handlers = None;
            }
        }

        Some(removed)
    }
}

impl std::fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeNode")
            .field("entry_name", &self.entry_name)
            .field("is_directory", &self.is_directory)
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .field(
                "dynamic_children",
                &self.dynamic_children.iter().map(|d| &d.key).collect::<Vec<_>>(),
            )
            .field("index", &self.index)
            .field("method_handlers", &self.method_handlers)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

/// Where a child lives within its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildSlot {
    Literal(String),
    Dynamic(usize),
}

/// All planted base directories. Roots never cross-reference each other.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    pub roots: HashMap<String, TreeNode>,
}

impl RouteTable {
    pub fn root(&self, name: &str) -> Option<&TreeNode> {
        self.roots.get(name)
    }

    pub fn root_mut(&mut self, name: &str) -> Option<&mut TreeNode> {
        self.roots.get_mut(name)
    }
}
