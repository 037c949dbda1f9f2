//! The re-arming watch loop.
//!
//! ```text
//! WAITING --watch fires--> EVALUATING --count < required--> WAITING
//!                                     --count >= required-> PASSED (terminal)
//! ```
//!
//! Every fired watch means "something changed": the monitor re-lists the
//! children with a fresh watch and evaluates the listing from scratch. The
//! diff against the previous listing only tells the leader which payloads to
//! read; the quorum decision always uses the live count.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use muster_core::CoordinationClient;
use muster_core::WatchEvent;
use snafu::ResultExt;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;

use crate::aggregator::AggregationReport;
use crate::aggregator::LeaderAggregator;
use crate::error::BarrierError;
use crate::error::ListingSnafu;
use crate::error::SessionLostSnafu;
use crate::payload::ParticipantPayload;
use crate::pure::AggregateStats;
use crate::pure::compute_added;
use crate::pure::elect_leader;
use crate::pure::is_leader;
use crate::pure::live_count;
use crate::quorum::BarrierLatch;
use crate::quorum::QuorumChecker;
use crate::quorum::QuorumDecision;
use crate::registrar::RegisteredParticipant;
use crate::status::BarrierOutcome;
use crate::status::BarrierPhase;
use crate::status::BarrierStatus;

/// Process-local membership snapshot.
#[derive(Debug, Default, Clone)]
pub struct BarrierView {
    children: Vec<String>,
    last_children: BTreeSet<String>,
}

impl BarrierView {
    /// An empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot with a new listing and return the children that
    /// were not in the previous one.
    pub fn observe(&mut self, children: Vec<String>) -> Vec<String> {
        let added = compute_added(&children, &self.last_children);
        self.last_children = children.iter().cloned().collect();
        self.children = children;
        added
    }

    /// The latest listing.
    pub fn children(&self) -> &[String] {
        &self.children
    }
}

/// What one evaluation round did.
#[derive(Debug)]
pub struct RoundReport {
    /// Quorum decision for the round.
    pub decision: QuorumDecision,
    /// Children not present in the previous listing.
    pub added: Vec<String>,
    /// Leader of the round.
    pub leader: Option<String>,
    /// Whether this participant led the round.
    pub is_leader: bool,
    /// Present when this participant led the round and saw new children.
    pub aggregation: Option<AggregationReport>,
}

/// Watches the barrier root and evaluates every membership change.
pub struct BarrierMonitor<C: CoordinationClient + ?Sized> {
    client: Arc<C>,
    participant: RegisteredParticipant,
    view: BarrierView,
    aggregator: LeaderAggregator,
    checker: QuorumChecker,
    latch: BarrierLatch,
    rounds: u32,
    statistics: Option<AggregateStats>,
    status_tx: Arc<watch::Sender<BarrierStatus>>,
}

impl<C: CoordinationClient + ?Sized> BarrierMonitor<C> {
    /// Create a monitor for a registered participant.
    pub fn new(
        client: Arc<C>,
        participant: RegisteredParticipant,
        required_count: u32,
        started_at: Instant,
        status_tx: Arc<watch::Sender<BarrierStatus>>,
    ) -> Self {
        let root_path = participant.root_path.clone();
        Self {
            client,
            aggregator: LeaderAggregator::new(root_path.clone()),
            checker: QuorumChecker::new(root_path, required_count, started_at),
            participant,
            view: BarrierView::new(),
            latch: BarrierLatch::new(),
            rounds: 0,
            statistics: None,
            status_tx,
        }
    }

    /// The participant this monitor evaluates for.
    pub fn participant(&self) -> &RegisteredParticipant {
        &self.participant
    }

    /// The leader-side metadata cache.
    pub fn aggregator(&self) -> &LeaderAggregator {
        &self.aggregator
    }

    /// Whether the barrier has been passed.
    pub fn is_passed(&self) -> bool {
        self.latch.is_passed()
    }

    /// Watch the barrier until it passes.
    ///
    /// Each iteration lists the children with a new watch before evaluating,
    /// so no change between two rounds goes unnoticed. On passage the pending
    /// watch is dropped and the monitor stops talking to the service.
    pub async fn run(mut self) -> Result<BarrierOutcome, BarrierError> {
        let root_path = self.participant.root_path.clone();
        loop {
            let (children, watch) =
                self.client.get_children_and_watch(&root_path).await.context(ListingSnafu { path: &root_path })?;

            let report = self.evaluate(children).await?;
            if let QuorumDecision::Passed { live_count, elapsed } = report.decision {
                return Ok(self.outcome(live_count, elapsed, report.is_leader));
            }

            match watch.changed().await {
                WatchEvent::ChildrenChanged { .. } => {
                    debug!(path = %root_path, node = %self.participant.node_name, "barrier children changed");
                }
                WatchEvent::SessionClosed => return SessionLostSnafu { path: root_path }.fail(),
            }
        }
    }

    /// Evaluate one children listing.
    ///
    /// After the barrier has passed this returns immediately without touching
    /// the view, the cache or the published status.
    pub async fn evaluate(&mut self, children: Vec<String>) -> Result<RoundReport, BarrierError> {
        if self.latch.is_passed() {
            return Ok(RoundReport {
                decision: QuorumDecision::AlreadyPassed,
                added: Vec::new(),
                leader: None,
                is_leader: false,
                aggregation: None,
            });
        }

        self.rounds = self.rounds.saturating_add(1);
        self.status_tx.send_modify(|status| status.phase = BarrierPhase::Evaluating);

        let added = self.view.observe(children);
        let children = self.view.children().to_vec();
        let leader = elect_leader(&children).map(str::to_string);
        let is_leader = is_leader(&self.participant.node_name, &children);

        let aggregation = if is_leader && !added.is_empty() {
            let report = self.aggregator.aggregate(&*self.client, &added, &children).await?;
            self.statistics = report.statistics;
            Some(report)
        } else {
            None
        };

        let leader_metadata: Option<ParticipantPayload> =
            leader.as_deref().and_then(|name| self.aggregator.metadata(name)).cloned();
        info!(leader = ?leader, metadata = ?leader_metadata, "leader metadata");

        let decision = self.checker.evaluate(&children, &mut self.latch);
        let phase = if decision.is_passed() {
            BarrierPhase::Passed
        } else {
            BarrierPhase::Waiting
        };

        self.status_tx.send_replace(BarrierStatus {
            node_name: Some(self.participant.node_name.clone()),
            phase,
            live_count: live_count(&children),
            required_count: self.checker.required_count(),
            leader: leader.clone(),
            is_leader,
            statistics: self.statistics,
            leader_metadata,
            rounds: self.rounds,
        });

        Ok(RoundReport {
            decision,
            added,
            leader,
            is_leader,
            aggregation,
        })
    }

    fn outcome(&self, live_count: u32, elapsed: Duration, was_leader: bool) -> BarrierOutcome {
        BarrierOutcome {
            node_path: self.participant.node_path.clone(),
            node_name: self.participant.node_name.clone(),
            live_count,
            required_count: self.checker.required_count(),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            rounds: self.rounds,
            was_leader,
            statistics: self.statistics,
        }
    }
}

#[cfg(test)]
mod tests {
    use muster_core::DeterministicCoordinationService;

    use super::*;
    use crate::registrar::ParticipantRegistrar;

    #[test]
    fn view_reports_only_new_children() {
        let mut view = BarrierView::new();
        assert_eq!(view.observe(vec!["b".into(), "a".into()]), vec!["b", "a"]);
        assert_eq!(view.observe(vec!["a".into(), "b".into(), "c".into()]), vec!["c"]);
        assert!(view.observe(vec!["c".into()]).is_empty());
        assert_eq!(view.children(), ["c"]);
    }

    #[tokio::test]
    async fn repeated_notification_is_idempotent() {
        let service = DeterministicCoordinationService::new();
        let session = Arc::new(service.connect());
        let participant = ParticipantRegistrar::new(session.clone())
            .register("/barrier", &ParticipantPayload::new(None, Some(8.0)))
            .await
            .unwrap();
        let (status_tx, status_rx) = watch::channel(BarrierStatus::registering(3));
        let mut monitor = BarrierMonitor::new(session, participant, 3, Instant::now(), Arc::new(status_tx));

        let children = service.children("/barrier");
        let first = monitor.evaluate(children.clone()).await.unwrap();
        assert_eq!(first.added.len(), 1);
        assert!(first.is_leader);
        let stats = status_rx.borrow().statistics;

        let second = monitor.evaluate(children).await.unwrap();
        assert!(second.added.is_empty());
        assert!(second.aggregation.is_none());
        assert_eq!(monitor.aggregator().cached_count(), 1);
        assert_eq!(status_rx.borrow().statistics, stats);
        assert_eq!(status_rx.borrow().rounds, 2);
    }

    #[tokio::test]
    async fn evaluation_after_passage_is_a_no_op() {
        let service = DeterministicCoordinationService::new();
        let session = Arc::new(service.connect());
        let participant = ParticipantRegistrar::new(session.clone())
            .register("/barrier", &ParticipantPayload::new(None, None))
            .await
            .unwrap();
        let (status_tx, status_rx) = watch::channel(BarrierStatus::registering(1));
        let mut monitor = BarrierMonitor::new(session, participant, 1, Instant::now(), Arc::new(status_tx));

        let children = service.children("/barrier");
        assert!(monitor.evaluate(children).await.unwrap().decision.is_passed());

        let report = monitor.evaluate(Vec::new()).await.unwrap();
        assert_eq!(report.decision, QuorumDecision::AlreadyPassed);
        assert!(monitor.is_passed());
        assert_eq!(status_rx.borrow().phase, BarrierPhase::Passed);
        assert_eq!(status_rx.borrow().live_count, 1);
    }
}
