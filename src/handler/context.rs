//! Handler execution context.
//!
//! # Responsibilities
//! - Carry request facts and free-form fields into a handler
//! - Scrub reserved control fields when deriving an execution context
//! - Capture the serializable subset of a completed context for caching
//!
//! # Design Decisions
//! - Control fields (status, redirect, headers, value, cache) are typed;
//!   everything else lives in a JSON field bag
//! - A cached entry merged into a context overrides caller-supplied fields

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// User-supplied cache key derivation: pure and deterministic for equal
/// contexts.
pub type VaryFn = dyn Fn(&Context) -> String + Send + Sync;

/// What a handler asked the loader to do with its completed context.
#[derive(Clone, Default)]
pub enum CacheDirective {
    /// Do not cache.
    #[default]
    Off,
    /// Cache unconditionally under the empty key.
    Unconditional,
    /// Cache keyed by the given vary function (first writer wins per path).
    Vary(Arc<VaryFn>),
}

impl std::fmt::Debug for CacheDirective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheDirective::Off => write!(f, "Off"),
            CacheDirective::Unconditional => write!(f, "Unconditional"),
            CacheDirective::Vary(_) => write!(f, "Vary(..)"),
        }
    }
}

/// The bag of named fields a handler executes against.
#[derive(Debug, Clone)]
pub struct Context {
    pub method: Method,
    pub query: Option<String>,

    /// Resolved filesystem path, injected by the loader.
    pub raw_path: String,

    /// Dynamic-segment captures, injected by the loader.
    pub params: HashMap<String, String>,

    pub status: Option<u16>,
    pub redirect: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub value: Vec<u8>,
    pub cache: CacheDirective,

    /// Free-form fields supplied by the caller or set by the handler.
    pub fields: serde_json::Map<String, Value>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            method: Method::GET,
            query: None,
            raw_path: String::new(),
            params: HashMap::new(),
            status: None,
            redirect: None,
            headers: BTreeMap::new(),
            value: Vec::new(),
            cache: CacheDirective::Off,
            fields: serde_json::Map::new(),
        }
    }
}

impl Context {
    pub fn for_method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn set_value(&mut self, value: impl Into<Vec<u8>>) {
        self.value = value.into();
    }

    /// Derive the fresh context a handler runs against: caller-supplied
    /// fields are kept, reserved control fields (cache, value, prior
    /// status/redirect) are cleared, and resolution facts are injected.
    pub fn for_execution(&self, raw_path: String, params: HashMap<String, String>) -> Self {
        Self {
            method: self.method.clone(),
            query: self.query.clone(),
            raw_path,
            params,
            status: None,
            redirect: None,
            headers: self.headers.clone(),
            value: Vec::new(),
            cache: CacheDirective::Off,
            fields: self.fields.clone(),
        }
    }

    /// The serializable subset persisted on cache-eligible completion.
    pub fn to_cache_entry(&self) -> CacheEntry {
        CacheEntry {
            status: self.status,
            redirect: self.redirect.clone(),
            headers: self.headers.clone(),
            value: self.value.clone(),
            fields: self.fields.clone(),
        }
    }

    /// Merge a cached entry into this context; cached fields win.
    pub fn apply_cached(&mut self, entry: &CacheEntry) {
        self.status = entry.status;
        self.redirect = entry.redirect.clone();
        for (k, v) in &entry.headers {
            self.headers.insert(k.clone(), v.clone());
        }
        self.value = entry.value.clone();
        for (k, v) in &entry.fields {
            self.fields.insert(k.clone(), v.clone());
        }
    }
}

/// Serializable subset of a completed context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub status: Option<u16>,
    pub redirect: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub value: Vec<u8>,
    pub fields: serde_json::Map<String, Value>,
}
