//! Observable barrier state.

use std::fmt;

use serde::Serialize;

use crate::payload::ParticipantPayload;
use crate::pure::AggregateStats;

/// Barrier phase as seen by one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierPhase {
    /// Creating the participant node.
    Registering,
    /// Registered, waiting for the next children change.
    Waiting,
    /// Re-reading membership after a change.
    Evaluating,
    /// Quorum reached. Terminal.
    Passed,
}

impl BarrierPhase {
    /// Convert the phase to a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BarrierPhase::Registering => "registering",
            BarrierPhase::Waiting => "waiting",
            BarrierPhase::Evaluating => "evaluating",
            BarrierPhase::Passed => "passed",
        }
    }
}

/// Snapshot published after every evaluation round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarrierStatus {
    /// This participant's node name, once registered.
    pub node_name: Option<String>,
    /// Current phase.
    pub phase: BarrierPhase,
    /// Live participants in the latest listing.
    pub live_count: u32,
    /// Participants required to pass.
    pub required_count: u32,
    /// Leader of the latest round.
    pub leader: Option<String>,
    /// Whether this participant led the latest round.
    pub is_leader: bool,
    /// Last statistics this participant computed as leader.
    pub statistics: Option<AggregateStats>,
    /// The leader's metadata as known to this participant's cache.
    pub leader_metadata: Option<ParticipantPayload>,
    /// Evaluation rounds so far.
    pub rounds: u32,
}

impl BarrierStatus {
    /// Initial status before registration.
    pub fn registering(required_count: u32) -> Self {
        Self {
            node_name: None,
            phase: BarrierPhase::Registering,
            live_count: 0,
            required_count,
            leader: None,
            is_leader: false,
            statistics: None,
            leader_metadata: None,
            rounds: 0,
        }
    }
}

impl fmt::Display for BarrierStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.live_count, self.required_count)
    }
}

/// Result of a barrier attempt that passed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarrierOutcome {
    /// Full path of this participant's node.
    pub node_path: String,
    /// This participant's node name.
    pub node_name: String,
    /// Live participants when the barrier passed.
    pub live_count: u32,
    /// Participants required.
    pub required_count: u32,
    /// Time from the start of the attempt to passage, in milliseconds.
    pub elapsed_ms: u64,
    /// Evaluation rounds until passage.
    pub rounds: u32,
    /// Whether this participant led the passing round.
    pub was_leader: bool,
    /// Last statistics this participant computed as leader.
    pub statistics: Option<AggregateStats>,
}
