//! Path normalization.
//!
//! # Responsibilities
//! - Canonicalize a raw URL path before resolution
//! - Collapse duplicate separators, strip `.`/`..` segments
//! - Strip page extensions and collapse `/index` to `/`
//!
//! # Design Decisions
//! - Pure string transforms; never touches the filesystem
//! - `..` segments are dropped, not resolved, so a request can never
//!   escape its base directory

/// Canonicalize a raw URL path.
///
/// `page_extensions` lists the extensions that never appear in public
/// paths (handler and markup files are addressed without them).
pub fn normalize(path: &str, page_extensions: &[String]) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    out.push('/');

    for segment in path.split(['/', '\\']) {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        if !out.ends_with('/') {
            out.push('/');
        }
        out.push_str(segment);
    }

    // Trailing slash is meaningful (directory index request); keep it.
    if path.ends_with('/') && !out.ends_with('/') {
        out.push('/');
    }

    for ext in page_extensions {
        let suffix = format!(".{}", ext);
        if out.ends_with(&suffix) {
            out.truncate(out.len() - suffix.len());
            break;
        }
    }

    if out.ends_with("/index") {
        out.truncate(out.len() - "index".len());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts() -> Vec<String> {
        vec!["njs".into(), "html".into(), "htm".into()]
    }

    #[test]
    fn collapses_duplicate_slashes() {
        assert_eq!(normalize("//a///b", &exts()), "/a/b");
    }

    #[test]
    fn strips_dot_segments() {
        assert_eq!(normalize("/a/./b", &exts()), "/a/b");
        assert_eq!(normalize("/a/../b", &exts()), "/a/b");
        assert_eq!(normalize("/../../etc/passwd", &exts()), "/etc/passwd");
    }

    #[test]
    fn strips_page_extensions() {
        assert_eq!(normalize("/a/b.njs", &exts()), "/a/b");
        assert_eq!(normalize("/a/b.html", &exts()), "/a/b");
        assert_eq!(normalize("/style.css", &exts()), "/style.css");
    }

    #[test]
    fn collapses_index() {
        assert_eq!(normalize("/a/index", &exts()), "/a/");
        assert_eq!(normalize("/a/index.njs", &exts()), "/a/");
        assert_eq!(normalize("/index", &exts()), "/");
    }

    #[test]
    fn preserves_trailing_slash() {
        assert_eq!(normalize("/a/", &exts()), "/a/");
        assert_eq!(normalize("/a", &exts()), "/a");
    }
}
