//! Article identifiers (slugs).
//!
//! An article's identifier is its source filename without the extension:
//! `content/articles/2020-01-01-hello.md` → `2020-01-01-hello`. The identifier
//! is the registry's dedup key and the article's URL path, so it has to be
//! URL-safe: ASCII letters, digits, `-`, `_` and `.` only. It also must not
//! shadow one of the site's own root entries ([`RESERVED`]).

use std::path::Path;

/// Derive the identifier for a source path. Returns `None` when the path has
/// no usable file stem.
pub fn extract_identifier(source: &Path) -> Option<String> {
    let stem = source.file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_string())
}

/// Names the build itself writes at the root of the output tree.
pub const RESERVED: [&str; 6] = [
    "a",
    "assets",
    "archive",
    "index.html",
    "articles.atom",
    "robots.txt",
];

/// Whether `identifier` would collide with a root entry of the site.
pub fn is_reserved(identifier: &str) -> bool {
    RESERVED.contains(&identifier)
}

/// Whether an identifier can be used verbatim as a URL path segment.
pub fn is_url_safe(identifier: &str) -> bool {
    !identifier.is_empty()
        && !identifier.starts_with('.')
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_directory_and_extension() {
        assert_eq!(
            extract_identifier(Path::new("content/articles/2020-01-01-hello.md")).as_deref(),
            Some("2020-01-01-hello")
        );
    }

    #[test]
    fn keeps_inner_dots() {
        assert_eq!(
            extract_identifier(Path::new("rust-1.0.md")).as_deref(),
            Some("rust-1.0")
        );
    }

    #[test]
    fn no_stem() {
        assert_eq!(extract_identifier(Path::new("")), None);
    }

    #[test]
    fn url_safety() {
        assert!(is_url_safe("2020-01-01-hello"));
        assert!(is_url_safe("rust_1.0"));
        assert!(!is_url_safe("hello world"));
        assert!(!is_url_safe("caf\u{e9}"));
        assert!(!is_url_safe(".hidden"));
        assert!(!is_url_safe(""));
    }

    #[test]
    fn reserved_names() {
        assert!(is_reserved("archive"));
        assert!(is_reserved("a"));
        assert!(!is_reserved("archives"));
    }
}
