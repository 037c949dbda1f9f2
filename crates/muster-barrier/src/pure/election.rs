//! Pure leader election.
//!
//! The leader of a round is the lexicographically smallest child name. The
//! service pads sequence suffixes to a fixed width, so this is also the
//! earliest-registered participant that is still live.

/// The leader among `children`, if any.
#[inline]
pub fn elect_leader(children: &[String]) -> Option<&str> {
    children.iter().min().map(String::as_str)
}

/// Whether `node_name` leads the round described by `children`.
#[inline]
pub fn is_leader(node_name: &str, children: &[String]) -> bool {
    elect_leader(children) == Some(node_name)
}
