//! Mapping between the node tree and the flat etcd keyspace.
//!
//! A node at `/a/b` is the key `/a/b`. Its children are the keys starting
//! with `/a/b/` that have no further `/`. Sequence counters live outside the
//! tree under [`SEQUENCE_KEY_PREFIX`].

use muster_core::CoordinationError;

/// Reserved prefix for per-parent sequence counters.
pub const SEQUENCE_KEY_PREFIX: &str = "__muster_seq:";

/// Maximum compare-and-swap attempts for one sequential create.
pub const MAX_CAS_RETRIES: u32 = 100;

/// Key prefix shared by all children of `path`.
pub fn children_prefix(path: &str) -> String {
    if path == "/" {
        "/".to_string()
    } else {
        format!("{path}/")
    }
}

/// The child name if `key` is a direct child under `prefix`.
pub fn direct_child<'a>(prefix: &str, key: &'a [u8]) -> Option<&'a str> {
    let key = std::str::from_utf8(key).ok()?;
    let name = key.strip_prefix(prefix)?;
    (!name.is_empty() && !name.contains('/')).then_some(name)
}

/// Counter key for sequential children of `parent`.
pub fn sequence_key(parent: &str) -> String {
    format!("{SEQUENCE_KEY_PREFIX}{parent}")
}

/// Parse a stored counter value.
pub fn parse_counter(key: &str, value: &[u8]) -> Result<u64, CoordinationError> {
    std::str::from_utf8(value).ok().and_then(|s| s.parse().ok()).ok_or_else(|| CoordinationError::Backend {
        reason: format!("corrupt sequence counter at '{key}'"),
    })
}
