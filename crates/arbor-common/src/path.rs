//! Tree path utilities
//!
//! Paths are absolute, slash-delimited, and never end with a separator
//! (except the tree root `/` itself). Application keys are resolved into
//! real paths under an optional namespace root.

use crate::error::{ClientError, Result};

/// Path segment separator
pub const SEPARATOR: char = '/';

/// The root of the tree
pub const ROOT: &str = "/";

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty())
}

fn from_segments<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for part in parts {
        out.push(SEPARATOR);
        out.push_str(part);
    }
    if out.is_empty() {
        out.push(SEPARATOR);
    }
    out
}

/// Real path of a namespace root
///
/// # Examples
///
/// ```
/// use arbor_common::path::namespace_root;
///
/// assert_eq!(namespace_root(""), "/");
/// assert_eq!(namespace_root("orchestration"), "/orchestration");
/// assert_eq!(namespace_root("/a/b/"), "/a/b");
/// ```
pub fn namespace_root(namespace: &str) -> String {
    from_segments(segments(namespace))
}

/// Resolve an application key into a real path under `namespace`
///
/// Keys that already carry the namespace root are returned normalized
/// rather than prefixed twice.
///
/// # Examples
///
/// ```
/// use arbor_common::path::real_path;
///
/// assert_eq!(real_path("ns", "config/app"), "/ns/config/app");
/// assert_eq!(real_path("ns", "/config/app"), "/ns/config/app");
/// assert_eq!(real_path("ns", "/ns/config/app"), "/ns/config/app");
/// assert_eq!(real_path("", "a//b/"), "/a/b");
/// ```
pub fn real_path(namespace: &str, key: &str) -> String {
    let root = namespace_root(namespace);
    let normalized = from_segments(segments(key));
    if root == ROOT {
        return normalized;
    }
    if key.starts_with(SEPARATOR) && is_within(&normalized, &root) {
        return normalized;
    }
    if normalized == ROOT {
        return root;
    }
    format!("{}{}", root, normalized)
}

/// Check that `path` is absolute and normalized
pub fn validate(path: &str) -> Result<()> {
    if path == ROOT {
        return Ok(());
    }
    if !path.starts_with(SEPARATOR) {
        return Err(ClientError::InvalidPath(format!(
            "{} must start with '{}'",
            path, SEPARATOR
        )));
    }
    if path.ends_with(SEPARATOR) || path.split(SEPARATOR).skip(1).any(str::is_empty) {
        return Err(ClientError::InvalidPath(format!(
            "{} contains an empty segment",
            path
        )));
    }
    Ok(())
}

/// Parent path, `None` for the root
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT || path.is_empty() {
        return None;
    }
    match path.rfind(SEPARATOR) {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Join a child name onto a parent path
pub fn join(parent: &str, child: &str) -> String {
    let child = child.trim_matches(SEPARATOR);
    if parent == ROOT {
        format!("{}{}", SEPARATOR, child)
    } else {
        format!("{}{}{}", parent.trim_end_matches(SEPARATOR), SEPARATOR, child)
    }
}

/// Strict ancestors of a path, top-down, excluding the tree root
///
/// ```
/// use arbor_common::path::ancestors;
///
/// assert_eq!(ancestors("/a/b/c"), vec!["/a", "/a/b"]);
/// assert!(ancestors("/a").is_empty());
/// ```
pub fn ancestors(path: &str) -> Vec<String> {
    let parts: Vec<&str> = segments(path).collect();
    (1..parts.len())
        .map(|n| from_segments(parts[..n].iter().copied()))
        .collect()
}

/// Whether `path` lies strictly beneath `boundary`
pub fn is_below(path: &str, boundary: &str) -> bool {
    if path == boundary {
        return false;
    }
    is_within(path, boundary)
}

/// Whether `path` is `boundary` itself or lies beneath it
pub fn is_within(path: &str, boundary: &str) -> bool {
    if boundary == ROOT {
        return path.starts_with(SEPARATOR);
    }
    path == boundary
        || path
            .strip_prefix(boundary)
            .is_some_and(|rest| rest.starts_with(SEPARATOR))
}
