//! Source map model.
//!
//! Only the fields the pipeline reads and rewrites are modeled; anything
//! else a transform emits is carried through untouched in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A v3 source map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceMap {
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sources: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl SourceMap {
    /// An empty map for a single generated file.
    pub fn identity(file: impl Into<String>) -> Self {
        Self {
            version: 3,
            file: Some(file.into()),
            sources: Vec::new(),
            names: Vec::new(),
            mappings: String::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Point `sources` at the retained pre-minification sibling so
    /// debuggers resolve against what is actually kept on disk.
    pub fn reroot(&mut self, source_name: impl Into<String>) {
        self.sources = vec![source_name.into()];
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{\"version\":3}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reroot_replaces_sources() {
        let mut map = SourceMap::identity("app.js");
        map.sources = vec!["webpack:///orig.js".into(), "other.js".into()];
        map.reroot("app.js.source");
        assert_eq!(map.sources, vec!["app.js.source".to_string()]);
    }

    #[test]
    fn extra_fields_round_trip() {
        let json = r#"{"version":3,"sources":["a"],"mappings":"AAAA","sourceRoot":"/x"}"#;
        let map: SourceMap = serde_json::from_str(json).unwrap();
        assert_eq!(map.extra["sourceRoot"], "/x");
        let out = map.to_json();
        assert!(out.contains("sourceRoot"));
    }
}
