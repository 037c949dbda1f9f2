//! Node path helpers.
//!
//! Paths are absolute, `/`-separated, with no empty components and no
//! trailing slash (the root `/` is the only exception).

use crate::error::CoordinationError;

/// Width of the zero-padded sequence suffix on sequential nodes.
///
/// Fixed width makes lexicographic order of names equal creation order.
pub const SEQUENCE_SUFFIX_WIDTH: usize = 10;

/// Validate an absolute node path.
pub fn validate_path(path: &str) -> Result<(), CoordinationError> {
    let reject = |reason: &str| {
        Err(CoordinationError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        })
    };

    if !path.starts_with('/') {
        return reject("path must start with '/'");
    }
    if path == "/" {
        return Ok(());
    }
    if path.ends_with('/') {
        return reject("path must not end with '/'");
    }
    if path[1..].split('/').any(str::is_empty) {
        return reject("path must not contain empty components");
    }
    Ok(())
}

/// Join a parent path and a child name.
pub fn join_path(parent: &str, child: &str) -> String {
    if parent == "/" {
        format!("/{child}")
    } else {
        format!("{parent}/{child}")
    }
}

/// Parent of a path, or `None` for the root.
pub fn parent_path(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Last component of a path.
pub fn leaf_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// All non-root prefixes of `path`, shortest first, including `path` itself.
///
/// `/a/b/c` yields `/a`, `/a/b`, `/a/b/c`.
pub fn ancestors_inclusive(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for component in path.split('/').filter(|c| !c.is_empty()) {
        current.push('/');
        current.push_str(component);
        out.push(current.clone());
    }
    out
}

/// Name assigned to a sequential node: the requested prefix plus the
/// zero-padded sequence number.
pub fn sequential_path(path_prefix: &str, sequence: u64) -> String {
    format!("{path_prefix}{sequence:0width$}", width = SEQUENCE_SUFFIX_WIDTH)
}
