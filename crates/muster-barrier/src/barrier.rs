//! One participant's barrier attempt.

use std::sync::Arc;
use std::time::Instant;

use muster_core::CoordinationClient;
use tokio::sync::watch;
use tracing::info;

use crate::config::BarrierConfig;
use crate::error::BarrierError;
use crate::monitor::BarrierMonitor;
use crate::payload::ParticipantPayload;
use crate::registrar::ParticipantRegistrar;
use crate::status::BarrierOutcome;
use crate::status::BarrierPhase;
use crate::status::BarrierStatus;

/// Registers on a session and waits until enough participants are live.
///
/// The participant borrows the session; closing it is the caller's job,
/// usually through [`crate::ExitSequencer`].
pub struct BarrierParticipant<C: CoordinationClient + ?Sized> {
    client: Arc<C>,
    config: BarrierConfig,
    status_tx: Arc<watch::Sender<BarrierStatus>>,
}

impl<C: CoordinationClient + ?Sized> BarrierParticipant<C> {
    /// Create a participant on an open session.
    pub fn new(client: Arc<C>, config: BarrierConfig) -> Self {
        let (status_tx, _) = watch::channel(BarrierStatus::registering(config.required_count));
        Self {
            client,
            config,
            status_tx: Arc::new(status_tx),
        }
    }

    /// The configuration of this attempt.
    pub fn config(&self) -> &BarrierConfig {
        &self.config
    }

    /// Subscribe to status updates published after each round.
    pub fn subscribe(&self) -> watch::Receiver<BarrierStatus> {
        self.status_tx.subscribe()
    }

    /// Latest published status.
    pub fn status(&self) -> BarrierStatus {
        self.status_tx.borrow().clone()
    }

    /// Register and wait for the barrier to pass.
    pub async fn enter(&self) -> Result<BarrierOutcome, BarrierError> {
        let started_at = Instant::now();
        info!(
            root_path = %self.config.root_path,
            required_count = self.config.required_count,
            "entering barrier"
        );

        let payload = ParticipantPayload::new(self.config.repository.clone(), self.config.participant_value);
        let registrar = ParticipantRegistrar::new(self.client.clone());
        let participant = registrar.register(&self.config.root_path, &payload).await?;
        self.status_tx.send_modify(|status| {
            status.node_name = Some(participant.node_name.clone());
            status.phase = BarrierPhase::Waiting;
        });

        BarrierMonitor::new(
            self.client.clone(),
            participant,
            self.config.required_count,
            started_at,
            self.status_tx.clone(),
        )
        .run()
        .await
    }
}

#[cfg(test)]
mod tests {
    use muster_core::DeterministicCoordinationService;

    use super::*;

    #[tokio::test]
    async fn single_participant_passes_with_count_one() {
        let service = DeterministicCoordinationService::new();
        let session = Arc::new(service.connect());
        let participant = BarrierParticipant::new(session, BarrierConfig::new("/solo", 1).with_value(3.0));

        let outcome = participant.enter().await.unwrap();
        assert_eq!(outcome.node_name, "participant-0000000000");
        assert_eq!(outcome.live_count, 1);
        assert!(outcome.was_leader);
        assert_eq!(outcome.statistics.unwrap().mean, 3.0);

        let status = participant.status();
        assert_eq!(status.phase, BarrierPhase::Passed);
        assert_eq!(status.rounds, 1);
    }
}
