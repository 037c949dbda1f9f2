//! Distributed rendezvous barrier.
//!
//! N independent processes register under a shared root on a coordination
//! service and wait until N of them are live. While waiting, the participant
//! holding the lexicographically smallest node name acts as leader and
//! aggregates the numeric values every participant published.
//!
//! ```text
//! ParticipantRegistrar -> BarrierMonitor -> LeaderAggregator (leader only)
//!                                        -> QuorumChecker -> ExitSequencer
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let participant = BarrierParticipant::new(session.clone(), BarrierConfig::new("/barrier", 3));
//! let sequencer = ExitSequencer::new(Duration::from_secs(2), shutdown);
//! let reason = sequencer.sequence(participant.enter()).await;
//! let status = sequencer.finish(&*session, &reason).await;
//! ```
//!
//! # Tiger Style
//!
//! - The barrier latch is one-way; a passed barrier never un-passes
//! - Watches are re-armed before every evaluation, never reused
//! - Peer-level metadata errors are logged and skipped; attempt-level errors reject
//! - The session is closed exactly once, by the exit sequencer

mod aggregator;
mod barrier;
mod config;
pub mod constants;
mod error;
mod exit;
mod monitor;
mod payload;
pub mod pure;
mod quorum;
mod registrar;
mod status;

pub use aggregator::AggregationReport;
pub use aggregator::LeaderAggregator;
pub use barrier::BarrierParticipant;
pub use config::BarrierConfig;
pub use error::BarrierError;
pub use error::MetadataError;
pub use exit::ExitReason;
pub use exit::ExitSequencer;
pub use exit::ExitStatus;
pub use monitor::BarrierMonitor;
pub use monitor::BarrierView;
pub use monitor::RoundReport;
pub use payload::ParticipantPayload;
pub use quorum::BarrierLatch;
pub use quorum::QuorumChecker;
pub use quorum::QuorumDecision;
pub use registrar::ParticipantRegistrar;
pub use registrar::RegisteredParticipant;
pub use status::BarrierOutcome;
pub use status::BarrierPhase;
pub use status::BarrierStatus;
