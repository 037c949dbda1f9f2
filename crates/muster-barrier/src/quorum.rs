//! Quorum detection and the one-way barrier latch.

use std::time::Duration;
use std::time::Instant;

use tracing::info;

use crate::pure::is_quorum_reached;
use crate::pure::live_count;

/// One-way flag marking that the barrier has been passed. Never resets.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BarrierLatch {
    passed: bool,
}

impl BarrierLatch {
    /// A latch that has not been passed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the barrier has been passed.
    pub fn is_passed(&self) -> bool {
        self.passed
    }

    /// Mark the barrier passed. Returns true only on the first call.
    pub fn trip(&mut self) -> bool {
        let first = !self.passed;
        self.passed = true;
        first
    }
}

/// Outcome of a quorum evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuorumDecision {
    /// Not enough live participants yet.
    Waiting {
        /// Live participants in this listing.
        live_count: u32,
        /// Participants required.
        required_count: u32,
    },
    /// This evaluation tripped the latch.
    Passed {
        /// Live participants in this listing.
        live_count: u32,
        /// Time since the barrier attempt began.
        elapsed: Duration,
    },
    /// The latch was already tripped; nothing was evaluated.
    AlreadyPassed,
}

impl QuorumDecision {
    /// Returns true if this evaluation passed the barrier.
    pub fn is_passed(&self) -> bool {
        matches!(self, QuorumDecision::Passed { .. })
    }
}

/// Compares the live child count against the required count.
#[derive(Debug, Clone)]
pub struct QuorumChecker {
    root_path: String,
    required_count: u32,
    started_at: Instant,
}

impl QuorumChecker {
    /// Create a checker for an attempt that began at `started_at`.
    pub fn new(root_path: impl Into<String>, required_count: u32, started_at: Instant) -> Self {
        Self {
            root_path: root_path.into(),
            required_count,
            started_at,
        }
    }

    /// Participants required to pass.
    pub fn required_count(&self) -> u32 {
        self.required_count
    }

    /// Evaluate a children listing.
    ///
    /// Only the live count matters, whether or not metadata could be read for
    /// every child. Once the latch is tripped every later call is a no-op.
    pub fn evaluate(&self, children: &[String], latch: &mut BarrierLatch) -> QuorumDecision {
        if latch.is_passed() {
            return QuorumDecision::AlreadyPassed;
        }

        let live_count = live_count(children);
        if !is_quorum_reached(live_count, self.required_count) {
            info!(
                path = %self.root_path,
                "waiting, ready: {}/{}",
                live_count,
                self.required_count
            );
            return QuorumDecision::Waiting {
                live_count,
                required_count: self.required_count,
            };
        }

        latch.trip();
        let elapsed = self.started_at.elapsed();
        info!(
            path = %self.root_path,
            live_count,
            elapsed = format_args!("{:.1}s", elapsed.as_secs_f64()),
            "barrier passed, all participants ready"
        );
        QuorumDecision::Passed { live_count, elapsed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn children(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("participant-{i:010}")).collect()
    }

    #[test]
    fn latch_trips_once() {
        let mut latch = BarrierLatch::new();
        assert!(!latch.is_passed());
        assert!(latch.trip());
        assert!(!latch.trip());
        assert!(latch.is_passed());
    }

    #[test]
    fn waits_below_threshold() {
        let checker = QuorumChecker::new("/barrier", 5, Instant::now());
        let mut latch = BarrierLatch::new();

        let decision = checker.evaluate(&children(3), &mut latch);
        assert_eq!(decision, QuorumDecision::Waiting {
            live_count: 3,
            required_count: 5,
        });
        assert!(!latch.is_passed());
    }

    #[test]
    fn passes_at_threshold_then_stays_passed() {
        let checker = QuorumChecker::new("/barrier", 3, Instant::now());
        let mut latch = BarrierLatch::new();

        assert!(checker.evaluate(&children(3), &mut latch).is_passed());
        assert!(latch.is_passed());

        // A later drop below threshold does not un-pass the barrier.
        assert_eq!(checker.evaluate(&children(1), &mut latch), QuorumDecision::AlreadyPassed);
        assert_eq!(checker.evaluate(&children(3), &mut latch), QuorumDecision::AlreadyPassed);
        assert!(latch.is_passed());
    }
}
