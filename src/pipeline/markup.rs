//! Markup and template minification.
//!
//! # Responsibilities
//! - Whole-file whitespace minification for plain markup
//! - Template-literal-aware minification for handler templates: the
//!   file is split on embedded raw-HTML literal blocks and only the
//!   text between them is collapsed
//!
//! # Design Decisions
//! - Bytes inside a raw-literal block pass through unmodified; naive
//!   whole-file minification would corrupt multi-line string literals
//! - Conservative on malformed input: an unterminated literal leaves
//!   the remainder of the file untouched

use std::sync::OnceLock;

use regex::Regex;

/// Opening tag of an embedded raw HTML literal block.
const LITERAL_OPEN: &str = "html`";

/// Scan a raw literal block whose opening backtick sits at `open`.
/// Returns the offset one past the closing backtick, or `None` when
/// the block is unterminated. `${...}` interpolations may nest braces
/// and carry quoted or backticked strings of their own, so a plain
/// regex cannot find the closing backtick reliably.
fn literal_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'`' => return Some(i + 1),
            b'$' if bytes.get(i + 1) == Some(&b'{') => i = interpolation_end(bytes, i + 2)?,
            b'\\' => i += 2,
            _ => i += 1,
        }
    }
    None
}

/// Scan past a `${...}` interpolation body, balancing braces and
/// skipping over string literals so their braces and backticks do not
/// count.
fn interpolation_end(bytes: &[u8], mut i: usize) -> Option<usize> {
    let mut depth = 1usize;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            quote @ (b'`' | b'"' | b'\'') => i = string_end(bytes, i + 1, quote)?,
            b'\\' => i += 2,
            _ => i += 1,
        }
    }
    None
}

fn string_end(bytes: &[u8], mut i: usize, quote: u8) -> Option<usize> {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Strip newlines and collapse whitespace runs to a single space.
pub fn minify_whitespace(input: &str) -> String {
    static WS: OnceLock<Regex> = OnceLock::new();
    let ws = WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern"));
    let no_newlines = input.replace(['\n', '\r'], "");
    ws.replace_all(&no_newlines, " ").into_owned()
}

/// Minify a handler template: whitespace outside raw-literal blocks is
/// collapsed, the blocks themselves are preserved byte-exact.
pub fn minify_template(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;
    while let Some(rel) = input[cursor..].find(LITERAL_OPEN) {
        let start = cursor + rel;
        let open = start + LITERAL_OPEN.len() - 1;
        match literal_end(input.as_bytes(), open) {
            Some(end) => {
                out.push_str(&minify_whitespace(&input[cursor..start]));
                out.push_str(&input[start..end]);
                cursor = end;
            }
            None => {
                // Unterminated block: collapse up to it, keep the rest raw.
                out.push_str(&minify_whitespace(&input[cursor..start]));
                out.push_str(&input[start..]);
                return out;
            }
        }
    }
    out.push_str(&minify_whitespace(&input[cursor..]));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_newlines() {
        assert_eq!(minify_whitespace("a\n  b\t\tc\r\n"), "a b c");
    }

    #[test]
    fn preserves_literal_blocks() {
        let input = "let page =\n    html`<p>\n  keep   this\n</p>`;\n\nexit();\n";
        let out = minify_template(input);
        assert!(out.contains("html`<p>\n  keep   this\n</p>`"));
        assert!(!out.contains("let page =\n"));
        assert!(out.contains("let page = html`"));
    }

    #[test]
    fn handles_interpolations_with_backticks() {
        let input = "html`<a>${wrap(`x\ny`)}</a>`\n\ncode();";
        let out = minify_template(input);
        assert!(out.contains("${wrap(`x\ny`)}"));
        assert!(out.ends_with("code();"));
    }

    #[test]
    fn interpolations_with_nested_braces_and_strings() {
        let input = "html`<p>\n  keep\n${f({x:1}) + `t`}\n  tail\n</p>`\nafter();\n";
        let out = minify_template(input);
        assert!(out.contains("${f({x:1}) + `t`}\n  tail\n</p>`"));
        assert!(out.ends_with("after();"));
    }

    #[test]
    fn quoted_braces_do_not_close_an_interpolation() {
        let input = "html`<i>\n${label(\"}\") + '{'}\n</i>`\nx();";
        let out = minify_template(input);
        assert!(out.contains("${label(\"}\") + '{'}\n</i>`"));
        assert!(out.ends_with("x();"));
    }

    #[test]
    fn unterminated_block_keeps_the_tail_raw() {
        let out = minify_template("a\n  b html`<p>\n  open");
        assert_eq!(out, "a b html`<p>\n  open");
    }

    #[test]
    fn multiple_blocks_alternate_correctly() {
        let input = "a \nhtml`<b>\n</b>` \nmid \nhtml`<i>\n</i>` \nend\n";
        let out = minify_template(input);
        assert_eq!(out, "a html`<b>\n</b>` mid html`<i>\n</i>` end");
    }

    #[test]
    fn plain_code_is_fully_collapsed() {
        assert_eq!(minify_template("x\n\n  y"), "x y");
    }
}
