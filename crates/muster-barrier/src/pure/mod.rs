//! Pure functions extracted from the barrier protocol for testability.
//!
//! The async shell (registrar, monitor, aggregator) does I/O and logging; the
//! decisions it takes live here as deterministic, side-effect free functions
//! that can be unit and property tested with explicit inputs.
//!
//! # Module Organization
//!
//! - [`barrier`]: membership diffs, live counts, quorum check
//! - [`election`]: lexicographic leader selection
//! - [`statistics`]: value filtering and max/min/mean
//!
//! # Tiger Style
//!
//! - Explicit count types (u32), saturating conversions
//! - No panics - all functions are total

pub mod barrier;
pub mod election;
pub mod statistics;

// ============================================================================
// Re-exports: Barrier
// ============================================================================

pub use barrier::compute_added;
pub use barrier::is_quorum_reached;
pub use barrier::live_count;

// ============================================================================
// Re-exports: Election
// ============================================================================

pub use election::elect_leader;
pub use election::is_leader;

// ============================================================================
// Re-exports: Statistics
// ============================================================================

pub use statistics::AggregateStats;
pub use statistics::compute_statistics;
pub use statistics::countable_value;
