//! Content pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! changed asset (path, raw bytes)
//!     → role dispatch by extension
//!     → handler template: literal-aware whitespace minify
//!     → markup: whole-file whitespace minify
//!     → script/style (under an asset root): transpile/compile
//!       → minify → re-rooted map + retained .source sibling
//!     → everything else: byte-identical passthrough
//! ```
//!
//! # Design Decisions
//! - Transforms are pluggable trait objects; defaults are conservative
//!   pure-Rust passes
//! - The pipeline returns sibling artifacts instead of writing them so
//!   the sync driver owns every disk mutation

pub mod markup;
pub mod script;
pub mod sourcemap;
pub mod style;

use std::sync::Arc;

use crate::config::ContentConfig;
use crate::error::ArborError;
use crate::pipeline::script::{ConservativeScript, ScriptTransform};
use crate::pipeline::style::{ConservativeStyle, StyleTransform};

/// A transformed asset plus the sibling files to write next to it.
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub contents: Vec<u8>,
    /// (relative path, bytes) pairs: the `.map` and `.source` siblings.
    pub siblings: Vec<(String, Vec<u8>)>,
}

impl TransformResult {
    fn passthrough(raw: Vec<u8>) -> Self {
        Self {
            contents: raw,
            siblings: Vec::new(),
        }
    }
}

/// File-content transform executed once per changed asset.
pub struct Pipeline {
    handler_extension: String,
    markup_extensions: Vec<String>,
    asset_roots: Vec<String>,
    script: Arc<dyn ScriptTransform>,
    style: Arc<dyn StyleTransform>,
}

impl Pipeline {
    pub fn new(content: &ContentConfig) -> Self {
        Self {
            handler_extension: content.handler_extension.clone(),
            markup_extensions: content.markup_extensions.clone(),
            asset_roots: content.roots.clone(),
            script: Arc::new(ConservativeScript),
            style: Arc::new(ConservativeStyle),
        }
    }

    pub fn with_transforms(
        mut self,
        script: Arc<dyn ScriptTransform>,
        style: Arc<dyn StyleTransform>,
    ) -> Self {
        self.script = script;
        self.style = style;
        self
    }

    /// Transform one asset. `path` is repository-relative (`www/a/b.njs`).
    pub fn transform(&self, path: &str, raw: Vec<u8>) -> Result<TransformResult, ArborError> {
        let Some(ext) = path.rsplit('.').next().filter(|_| path.contains('.')) else {
            return Ok(TransformResult::passthrough(raw));
        };

        if ext == self.handler_extension {
            let source = text(path, raw)?;
            return Ok(TransformResult::passthrough(
                markup::minify_template(&source).into_bytes(),
            ));
        }
        if self.markup_extensions.iter().any(|m| m == ext) {
            let source = text(path, raw)?;
            return Ok(TransformResult::passthrough(
                markup::minify_whitespace(&source).into_bytes(),
            ));
        }

        if self.under_asset_root(path) {
            if ext == "js" {
                return self.transform_asset(path, raw, |name, src| {
                    let stage = self.script.transpile(name, src)?;
                    self.script.minify(name, &stage.code, stage.map)
                });
            }
            if ext == "css" {
                return self.transform_asset(path, raw, |name, src| {
                    let stage = self.style.compile(name, src)?;
                    self.style.minify(name, &stage.code, stage.map)
                });
            }
        }

        Ok(TransformResult::passthrough(raw))
    }

    fn transform_asset<F>(
        &self,
        path: &str,
        raw: Vec<u8>,
        run: F,
    ) -> Result<TransformResult, ArborError>
    where
        F: FnOnce(&str, &str) -> Result<script::TransformOutput, String>,
    {
        let source = text(path, raw)?;
        let file_name = path.rsplit('/').next().unwrap_or(path);

        let mut output = run(file_name, &source).map_err(|reason| ArborError::Transform {
            path: path.to_string(),
            reason,
        })?;

        // Debuggers resolve against the retained pre-minification sibling.
        let source_name = format!("{}.source", file_name);
        output.map.reroot(source_name);
        output.map.file = Some(file_name.to_string());

        Ok(TransformResult {
            contents: output.code.into_bytes(),
            siblings: vec![
                (format!("{}.map", path), output.map.to_json().into_bytes()),
                (format!("{}.source", path), source.into_bytes()),
            ],
        })
    }

    fn under_asset_root(&self, path: &str) -> bool {
        self.asset_roots
            .iter()
            .any(|root| path.starts_with(&format!("{}/", root)))
    }

    /// Extensions with sibling artifacts, used when deleting files.
    pub fn has_siblings(&self, path: &str) -> bool {
        let ext = path.rsplit('.').next().unwrap_or("");
        (ext == "js" || ext == "css") && self.under_asset_root(path)
    }
}

fn text(path: &str, raw: Vec<u8>) -> Result<String, ArborError> {
    String::from_utf8(raw).map_err(|_| ArborError::Transform {
        path: path.to_string(),
        reason: "not valid UTF-8".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentConfig;

    fn pipeline() -> Pipeline {
        Pipeline::new(&ContentConfig::default())
    }

    #[test]
    fn templates_keep_literal_blocks() {
        let raw = b"code()\n\nhtml`<pre>\n  kept\n</pre>`\n".to_vec();
        let out = pipeline().transform("www/a.njs", raw).unwrap();
        let text = String::from_utf8(out.contents).unwrap();
        assert!(text.contains("<pre>\n  kept\n</pre>"));
        assert!(!text.starts_with("code()\n"));
        assert!(out.siblings.is_empty());
    }

    #[test]
    fn scripts_gain_map_and_source_siblings() {
        let raw = b"// comment\nlet a = 1;\n".to_vec();
        let out = pipeline().transform("www/js/app.js", raw.clone()).unwrap();
        assert_eq!(out.contents, b"let a = 1;\n");

        let names: Vec<&str> = out.siblings.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["www/js/app.js.map", "www/js/app.js.source"]);

        let (_, map_bytes) = &out.siblings[0];
        let map: sourcemap::SourceMap = serde_json::from_slice(map_bytes).unwrap();
        assert_eq!(map.sources, vec!["app.js.source".to_string()]);

        let (_, source_bytes) = &out.siblings[1];
        assert_eq!(source_bytes, &raw);
    }

    #[test]
    fn scripts_outside_asset_roots_pass_through() {
        let raw = b"// kept\nlet a = 1;\n".to_vec();
        let out = pipeline().transform("tools/app.js", raw.clone()).unwrap();
        assert_eq!(out.contents, raw);
        assert!(out.siblings.is_empty());
    }

    #[test]
    fn unknown_assets_pass_through_byte_identical() {
        let raw = vec![0u8, 159, 146, 150];
        let out = pipeline().transform("www/img.png", raw.clone()).unwrap();
        assert_eq!(out.contents, raw);
        assert!(out.siblings.is_empty());
    }
}
