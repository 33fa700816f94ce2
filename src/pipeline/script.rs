//! Script asset transform.
//!
//! The transpile and minify steps are pluggable; real deployments slot
//! in an external toolchain. The default implementation is a
//! conservative pure-Rust pass: strip comments, drop blank lines, and
//! emit an identity-style map. If unsure about a construct it emits the
//! input unchanged rather than risk breaking syntax.

use crate::pipeline::sourcemap::SourceMap;

/// Output of one transform stage.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub code: String,
    pub map: SourceMap,
}

/// External JS transform: transpile then minify, each producing code
/// plus a source map.
pub trait ScriptTransform: Send + Sync {
    fn transpile(&self, file_name: &str, source: &str) -> Result<TransformOutput, String>;

    /// Minify transpiled code, consuming the intermediate map.
    fn minify(&self, file_name: &str, code: &str, map: SourceMap)
        -> Result<TransformOutput, String>;
}

/// Parsing state for the comment-stripping state machine.
enum State {
    Normal,
    InString(char),
    InStringEscape(char),
    AfterSlash,
    InBlockComment,
    InBlockCommentEnd,
    InLineComment,
}

/// Strip `/* */` and `//` comments, leaving string literals intact.
pub fn strip_comments(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut state = State::Normal;

    for ch in input.chars() {
        match state {
            State::Normal => {
                output.push(ch);
                match ch {
                    '"' | '\'' | '`' => state = State::InString(ch),
                    '/' => state = State::AfterSlash,
                    _ => {}
                }
            }
            State::AfterSlash => match ch {
                '*' => {
                    output.pop();
                    state = State::InBlockComment;
                }
                '/' => {
                    output.pop();
                    state = State::InLineComment;
                }
                _ => {
                    // Not a comment opener; keep the char so regex and
                    // division expressions survive untouched.
                    output.push(ch);
                    state = State::Normal;
                }
            },
            State::InString(quote) => {
                output.push(ch);
                if ch == '\\' {
                    state = State::InStringEscape(quote);
                } else if ch == quote {
                    state = State::Normal;
                }
            }
            State::InStringEscape(quote) => {
                output.push(ch);
                state = State::InString(quote);
            }
            State::InBlockComment => {
                if ch == '*' {
                    state = State::InBlockCommentEnd;
                }
            }
            State::InBlockCommentEnd => {
                if ch == '/' {
                    state = State::Normal;
                } else if ch != '*' {
                    state = State::InBlockComment;
                }
            }
            State::InLineComment => {
                if ch == '\n' || ch == '\r' {
                    output.push(ch);
                    state = State::Normal;
                }
            }
        }
    }
    output
}

fn drop_blank_lines(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for line in input.lines() {
        let trimmed = line.trim_end();
        if trimmed.trim_start().is_empty() {
            continue;
        }
        out.push_str(trimmed);
        out.push('\n');
    }
    out
}

/// Conservative default transform.
pub struct ConservativeScript;

impl ScriptTransform for ConservativeScript {
    fn transpile(&self, file_name: &str, source: &str) -> Result<TransformOutput, String> {
        let mut map = SourceMap::identity(file_name);
        map.sources = vec![file_name.to_string()];
        Ok(TransformOutput {
            code: strip_comments(source),
            map,
        })
    }

    fn minify(
        &self,
        _file_name: &str,
        code: &str,
        map: SourceMap,
    ) -> Result<TransformOutput, String> {
        Ok(TransformOutput {
            code: drop_blank_lines(code),
            map,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_line_and_block_comments() {
        let src = "let a = 1; // trailing\n/* gone\n   entirely */let b = 2;\n";
        assert_eq!(strip_comments(src), "let a = 1; \nlet b = 2;\n");
    }

    #[test]
    fn keeps_comment_lookalikes_in_strings() {
        let src = "let url = \"https://example.com\"; let re = `a // b`;";
        assert_eq!(strip_comments(src), src);
    }

    #[test]
    fn keeps_division() {
        let src = "let x = a / b / c;\n";
        assert_eq!(strip_comments(src), src);
    }

    #[test]
    fn default_transform_is_conservative() {
        let t = ConservativeScript;
        let out = t.transpile("app.js", "let a = 1;\n\n// gone\nlet b = 2;\n").unwrap();
        let min = t.minify("app.js", &out.code, out.map).unwrap();
        assert_eq!(min.code, "let a = 1;\nlet b = 2;\n");
        assert_eq!(min.map.sources, vec!["app.js".to_string()]);
    }
}
