//! Filename and segment classification.
//!
//! # Responsibilities
//! - Parse entry names into a typed `SegmentKind` once, at plant time
//! - Compile `{param}` placeholders into anchored matchers
//! - Recognize index files, method-dispatch lists and the `ALL` catch-all
//!
//! # Design Decisions
//! - Classification precedence: index, method list, catch-all, literal
//! - Method lists accept up to 5 distinct methods (GET/POST/PUT/DELETE/PATCH);
//!   anything else falls through to a literal segment
//! - Matching is case-sensitive, anchored, whole-segment only

use axum::http::Method;
use regex::Regex;

use crate::config::ContentConfig;
use crate::error::ArborError;

/// File-naming conventions, derived from config once at startup.
#[derive(Debug, Clone)]
pub struct Naming {
    pub handler_extension: String,
    pub markup_extensions: Vec<String>,
}

impl Naming {
    pub fn from_config(content: &ContentConfig) -> Self {
        Self {
            handler_extension: content.handler_extension.clone(),
            markup_extensions: content.markup_extensions.clone(),
        }
    }

    /// True if the file is a dynamic handler.
    pub fn is_handler(&self, file_name: &str) -> bool {
        extension(file_name) == Some(self.handler_extension.as_str())
    }

    /// True if the file is a page (handler or markup); pages are addressed
    /// publicly without their extension.
    pub fn is_page(&self, file_name: &str) -> bool {
        match extension(file_name) {
            Some(ext) => {
                ext == self.handler_extension || self.markup_extensions.iter().any(|m| m == ext)
            }
            None => false,
        }
    }

    /// The segment key a file is routed under: page files lose their
    /// extension, other assets keep the full name.
    pub fn route_key<'a>(&self, file_name: &'a str) -> &'a str {
        if self.is_page(file_name) {
            match file_name.rfind('.') {
                Some(dot) => &file_name[..dot],
                None => file_name,
            }
        } else {
            file_name
        }
    }
}

/// What one directory entry contributes to the tree.
#[derive(Debug, Clone)]
pub enum SegmentKind {
    /// `index.<anything>.<ext>`: the directory's index file.
    Index,
    /// `GET,POST.<ext>`: one handler registered per listed method.
    MethodDispatch(Vec<Method>),
    /// `ALL.<ext>`: fallback handler for every unclaimed method.
    CatchAll,
    /// A segment containing `{param}` placeholders.
    Pattern { params: Vec<String>, matcher: Regex },
    /// Anything else: an exact, case-sensitive segment.
    Literal(String),
}

const METHOD_NAMES: [&str; 5] = ["GET", "POST", "PUT", "DELETE", "PATCH"];

fn extension(file_name: &str) -> Option<&str> {
    file_name.rfind('.').map(|dot| &file_name[dot + 1..])
}

fn parse_method_list(stem: &str) -> Option<Vec<Method>> {
    let mut methods = Vec::new();
    for name in stem.split(',') {
        if !METHOD_NAMES.contains(&name) {
            return None;
        }
        let method = Method::from_bytes(name.as_bytes()).ok()?;
        if methods.contains(&method) {
            return None;
        }
        methods.push(method);
    }
    if methods.is_empty() || methods.len() > METHOD_NAMES.len() {
        return None;
    }
    Some(methods)
}

/// True if a path segment's literal text names a dispatch token
/// (`GET`, `GET,POST`, `ALL`). Requesting those directly is forbidden.
pub fn is_dispatch_token(segment: &str) -> bool {
    segment == "ALL" || parse_method_list(segment).is_some()
}

/// Classify a file entry name.
pub fn classify_file(file_name: &str, naming: &Naming) -> Result<SegmentKind, ArborError> {
    if naming.is_page(file_name) {
        if file_name.split('.').next() == Some("index") {
            return Ok(SegmentKind::Index);
        }
        if naming.is_handler(file_name) {
            let stem = naming.route_key(file_name);
            if stem == "ALL" {
                return Ok(SegmentKind::CatchAll);
            }
            if let Some(methods) = parse_method_list(stem) {
                return Ok(SegmentKind::MethodDispatch(methods));
            }
        }
    }
    classify_segment(naming.route_key(file_name))
}

/// Classify a bare segment key (used directly for directory names).
pub fn classify_segment(key: &str) -> Result<SegmentKind, ArborError> {
    if !key.contains('{') {
        return Ok(SegmentKind::Literal(key.to_string()));
    }

    let mut params = Vec::new();
    let mut pattern = String::from("^");
    let mut rest = key;
    while let Some(open) = rest.find('{') {
        pattern.push_str(&regex::escape(&rest[..open]));
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| {
            ArborError::Configuration(format!("unclosed '{{' in route segment {:?}", key))
        })?;
        let name = &after[..close];
        if name.is_empty() {
            return Err(ArborError::Configuration(format!(
                "empty parameter name in route segment {:?}",
                key
            )));
        }
        params.push(name.to_string());
        pattern.push_str("([^/]+)");
        rest = &after[close + 1..];
    }
    pattern.push_str(&regex::escape(rest));
    pattern.push('$');

    let matcher = Regex::new(&pattern).map_err(|e| {
        ArborError::Configuration(format!("invalid route segment {:?}: {}", key, e))
    })?;

    Ok(SegmentKind::Pattern { params, matcher })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naming() -> Naming {
        Naming {
            handler_extension: "njs".into(),
            markup_extensions: vec!["html".into(), "htm".into()],
        }
    }

    #[test]
    fn classifies_index_files() {
        assert!(matches!(
            classify_file("index.njs", &naming()).unwrap(),
            SegmentKind::Index
        ));
        assert!(matches!(
            classify_file("index.home.html", &naming()).unwrap(),
            SegmentKind::Index
        ));
        // Not a page extension, so not an index.
        assert!(matches!(
            classify_file("index.css", &naming()).unwrap(),
            SegmentKind::Literal(_)
        ));
    }

    #[test]
    fn classifies_method_lists() {
        match classify_file("GET,POST.njs", &naming()).unwrap() {
            SegmentKind::MethodDispatch(methods) => {
                assert_eq!(methods, vec![Method::GET, Method::POST]);
            }
            other => panic!("unexpected kind: {:?}", other),
        }
        assert!(matches!(
            classify_file("ALL.njs", &naming()).unwrap(),
            SegmentKind::CatchAll
        ));
        // Duplicates and unknown verbs are literals, not dispatch groups.
        assert!(matches!(
            classify_file("GET,GET.njs", &naming()).unwrap(),
            SegmentKind::Literal(_)
        ));
        assert!(matches!(
            classify_file("FETCH.njs", &naming()).unwrap(),
            SegmentKind::Literal(_)
        ));
        // Markup files never dispatch by method.
        assert!(matches!(
            classify_file("GET.html", &naming()).unwrap(),
            SegmentKind::Literal(_)
        ));
    }

    #[test]
    fn compiles_patterns() {
        match classify_file("{id}.njs", &naming()).unwrap() {
            SegmentKind::Pattern { params, matcher } => {
                assert_eq!(params, vec!["id"]);
                assert!(matcher.is_match("123"));
                assert!(!matcher.is_match(""));
            }
            other => panic!("unexpected kind: {:?}", other),
        }

        match classify_segment("user-{name}-{rev}").unwrap() {
            SegmentKind::Pattern { params, matcher } => {
                assert_eq!(params, vec!["name", "rev"]);
                let caps = matcher.captures("user-bob-7").unwrap();
                assert_eq!(&caps[1], "bob");
                assert_eq!(&caps[2], "7");
                assert!(!matcher.is_match("user-bob-7-extra-"));
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn pattern_matching_is_case_sensitive_and_whole_segment() {
        match classify_segment("a{x}b").unwrap() {
            SegmentKind::Pattern { matcher, .. } => {
                assert!(matcher.is_match("a1b"));
                assert!(!matcher.is_match("A1b"));
                assert!(!matcher.is_match("za1bz"));
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn unclosed_brace_is_a_configuration_error() {
        assert!(classify_segment("{id").is_err());
        assert!(classify_segment("{}").is_err());
    }

    #[test]
    fn route_keys_drop_page_extensions_only() {
        let n = naming();
        assert_eq!(n.route_key("about.njs"), "about");
        assert_eq!(n.route_key("about.html"), "about");
        assert_eq!(n.route_key("style.css"), "style.css");
    }

    #[test]
    fn dispatch_tokens_are_recognized() {
        assert!(is_dispatch_token("GET"));
        assert!(is_dispatch_token("GET,POST"));
        assert!(is_dispatch_token("ALL"));
        assert!(!is_dispatch_token("get"));
        assert!(!is_dispatch_token("about"));
    }
}
