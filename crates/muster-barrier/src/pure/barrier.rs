//! Pure barrier membership functions.

use std::collections::BTreeSet;

/// Children present now that were absent from the previous listing.
///
/// Order follows `children`. The result only tells the leader which payloads
/// it has not read yet; it never feeds the quorum decision.
pub fn compute_added(children: &[String], last_children: &BTreeSet<String>) -> Vec<String> {
    children.iter().filter(|child| !last_children.contains(*child)).cloned().collect()
}

/// Number of live participants in a listing, saturating at `u32::MAX`.
#[inline]
pub fn live_count(children: &[String]) -> u32 {
    u32::try_from(children.len()).unwrap_or(u32::MAX)
}

/// Whether enough participants are live to pass the barrier.
///
/// # Example
///
/// ```ignore
/// assert!(!is_quorum_reached(2, 3));
/// assert!(is_quorum_reached(3, 3));
/// assert!(is_quorum_reached(4, 3));
/// ```
#[inline]
pub fn is_quorum_reached(live_count: u32, required_count: u32) -> bool {
    live_count >= required_count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn added_is_everything_on_first_listing() {
        let children = names(&["participant-0000000001", "participant-0000000000"]);
        assert_eq!(compute_added(&children, &BTreeSet::new()), children);
    }

    #[test]
    fn added_excludes_known_children() {
        let last: BTreeSet<String> = names(&["participant-0000000000"]).into_iter().collect();
        let children = names(&["participant-0000000000", "participant-0000000001"]);
        assert_eq!(compute_added(&children, &last), names(&["participant-0000000001"]));
    }

    #[test]
    fn departure_adds_nothing() {
        let last: BTreeSet<String> = names(&["participant-0000000000", "participant-0000000001"]).into_iter().collect();
        let children = names(&["participant-0000000001"]);
        assert!(compute_added(&children, &last).is_empty());
    }

    #[test]
    fn quorum_threshold() {
        assert!(!is_quorum_reached(0, 1));
        assert!(!is_quorum_reached(2, 3));
        assert!(is_quorum_reached(3, 3));
        assert!(is_quorum_reached(5, 3));
    }

    #[test]
    fn live_count_matches_len() {
        assert_eq!(live_count(&names(&["a", "b", "c"])), 3);
        assert_eq!(live_count(&[]), 0);
    }
}
