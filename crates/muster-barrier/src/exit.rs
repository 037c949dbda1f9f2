//! Exit sequencing.
//!
//! Three mutually exclusive ways out of a barrier attempt:
//!
//! - passed: wait the exit delay so peers can observe passage, then close
//! - failed: close immediately, exit with failure
//! - interrupted: close immediately, exit with success, even mid-delay
//!
//! [`ExitSequencer::finish`] consumes the sequencer, so the session is closed
//! once per attempt.

use std::future::Future;
use std::time::Duration;

use muster_core::CoordinationClient;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::error::BarrierError;
use crate::status::BarrierOutcome;

/// Why a barrier attempt ended.
#[derive(Debug)]
pub enum ExitReason {
    /// The barrier passed and the exit delay elapsed.
    Passed(BarrierOutcome),
    /// A shutdown signal arrived before the attempt completed.
    Interrupted,
    /// The attempt was rejected.
    Failed(BarrierError),
}

impl ExitReason {
    /// Process status for this reason. Interruption is a success.
    pub fn status(&self) -> ExitStatus {
        match self {
            ExitReason::Passed(_) | ExitReason::Interrupted => ExitStatus::Success,
            ExitReason::Failed(_) => ExitStatus::Failure,
        }
    }
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Exit code 0.
    Success,
    /// Exit code 1.
    Failure,
}

impl ExitStatus {
    /// Numeric process exit code.
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
        }
    }
}

/// Drives a barrier attempt to one of its exits.
#[derive(Debug)]
pub struct ExitSequencer {
    exit_delay: Duration,
    shutdown: CancellationToken,
}

impl ExitSequencer {
    /// Create a sequencer. Cancelling `shutdown` pre-empts both the attempt
    /// and the exit delay.
    pub fn new(exit_delay: Duration, shutdown: CancellationToken) -> Self {
        Self { exit_delay, shutdown }
    }

    /// Delay applied after passage.
    pub fn exit_delay(&self) -> Duration {
        self.exit_delay
    }

    /// Await the attempt, then the exit delay if it passed.
    ///
    /// On interruption the attempt future is dropped without awaiting any
    /// in-flight service call.
    pub async fn sequence<F>(&self, attempt: F) -> ExitReason
    where F: Future<Output = Result<BarrierOutcome, BarrierError>> {
        let result = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                info!("shutdown requested, leaving barrier");
                return ExitReason::Interrupted;
            }
            result = attempt => result,
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "barrier attempt failed");
                return ExitReason::Failed(err);
            }
        };

        let delay_ms = u64::try_from(self.exit_delay.as_millis()).unwrap_or(u64::MAX);
        info!(delay_ms, "waiting for peers to observe passage");
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                info!("shutdown requested during exit delay");
                ExitReason::Interrupted
            }
            _ = tokio::time::sleep(self.exit_delay) => {
                info!("safe to exit");
                ExitReason::Passed(outcome)
            }
        }
    }

    /// Close the session and return the process status for `reason`.
    ///
    /// A close failure is logged and does not change the status: the session
    /// is gone either way once the process exits.
    pub async fn finish<C: CoordinationClient + ?Sized>(self, client: &C, reason: &ExitReason) -> ExitStatus {
        match client.close().await {
            Ok(()) => info!(session_id = client.session_id(), "session closed"),
            Err(err) => warn!(session_id = client.session_id(), error = %err, "failed to close session"),
        }
        reason.status()
    }
}
