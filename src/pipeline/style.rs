//! Style asset transform.
//!
//! Mirrors the script transform: a pluggable compile step (preprocessor)
//! and a minify step, each producing CSS plus a source map. The default
//! is a conservative pure-Rust pass.

use std::sync::OnceLock;

use regex::Regex;

use crate::pipeline::script::TransformOutput;
use crate::pipeline::sourcemap::SourceMap;

/// External CSS transform: compile then minify.
pub trait StyleTransform: Send + Sync {
    fn compile(&self, file_name: &str, source: &str) -> Result<TransformOutput, String>;

    fn minify(&self, file_name: &str, css: &str, map: SourceMap)
        -> Result<TransformOutput, String>;
}

fn strip_css_comments(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("css comment pattern"));
    re.replace_all(input, "").into_owned()
}

fn collapse_css(input: &str) -> String {
    static WS: OnceLock<Regex> = OnceLock::new();
    let ws = WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern"));
    let collapsed = ws.replace_all(input, " ");
    collapsed
        .replace(" {", "{")
        .replace("{ ", "{")
        .replace(" }", "}")
        .replace("; ", ";")
        .replace(": ", ":")
        .trim()
        .to_string()
}

/// Conservative default transform.
pub struct ConservativeStyle;

impl StyleTransform for ConservativeStyle {
    fn compile(&self, file_name: &str, source: &str) -> Result<TransformOutput, String> {
        let mut map = SourceMap::identity(file_name);
        map.sources = vec![file_name.to_string()];
        Ok(TransformOutput {
            code: strip_css_comments(source),
            map,
        })
    }

    fn minify(
        &self,
        _file_name: &str,
        css: &str,
        map: SourceMap,
    ) -> Result<TransformOutput, String> {
        Ok(TransformOutput {
            code: collapse_css(css),
            map,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_and_collapses() {
        let t = ConservativeStyle;
        let src = "/* header */\nbody {\n    color: red;\n}\n";
        let out = t.compile("a.css", src).unwrap();
        let min = t.minify("a.css", &out.code, out.map).unwrap();
        assert_eq!(min.code, "body{color:red;}");
    }
}
