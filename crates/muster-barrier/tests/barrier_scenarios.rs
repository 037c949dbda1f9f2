//! Multi-participant barrier scenarios over the in-memory coordination service.

use std::sync::Arc;
use std::time::Duration;

use muster_barrier::BarrierConfig;
use muster_barrier::BarrierError;
use muster_barrier::BarrierOutcome;
use muster_barrier::BarrierParticipant;
use muster_barrier::BarrierPhase;
use muster_barrier::BarrierStatus;
use muster_core::CoordinationClient;
use muster_core::CreateMode;
use muster_core::DeterministicCoordinationService;
use muster_core::DeterministicSession;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const ROOT: &str = "/ci/barrier";

struct Running {
    session: Arc<DeterministicSession>,
    handle: JoinHandle<Result<BarrierOutcome, BarrierError>>,
    status: watch::Receiver<BarrierStatus>,
}

fn spawn_participant(service: &Arc<DeterministicCoordinationService>, count: u32, value: Option<f64>) -> Running {
    let session = Arc::new(service.connect());
    let mut config = BarrierConfig::new(ROOT, count).with_repository("org/repo");
    config.participant_value = value;
    let participant = BarrierParticipant::new(session.clone(), config);
    let status = participant.subscribe();
    let handle = tokio::spawn(async move { participant.enter().await });
    Running { session, handle, status }
}

async fn wait_for_children(service: &DeterministicCoordinationService, n: usize) {
    while service.children(ROOT).len() < n {
        tokio::task::yield_now().await;
    }
    // Let every waiting monitor re-arm its watch.
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn three_participants_pass_and_leader_aggregates() {
    let service = DeterministicCoordinationService::new();
    let running: Vec<Running> =
        [10.0, 20.0, 30.0].into_iter().map(|v| spawn_participant(&service, 3, Some(v))).collect();

    let mut outcomes = Vec::new();
    for r in running {
        outcomes.push(r.handle.await.unwrap().unwrap());
    }

    for outcome in &outcomes {
        assert!(outcome.live_count >= 3);
        assert_eq!(outcome.required_count, 3);
    }

    let leaders: Vec<&BarrierOutcome> = outcomes.iter().filter(|o| o.was_leader).collect();
    assert_eq!(leaders.len(), 1);
    assert_eq!(leaders[0].node_name, "participant-0000000000");

    let stats = leaders[0].statistics.unwrap();
    assert_eq!(stats.count, 3);
    assert_eq!(stats.max, 30.0);
    assert_eq!(stats.min, 10.0);
    assert_eq!(stats.mean, 20.0);

    // Non-leaders never read peer metadata.
    assert!(outcomes.iter().filter(|o| !o.was_leader).all(|o| o.statistics.is_none()));
}

#[tokio::test]
async fn leader_crash_hands_over_with_empty_cache() {
    let service = DeterministicCoordinationService::new();
    let first = spawn_participant(&service, 3, Some(100.0));
    wait_for_children(&service, 1).await;
    let second = spawn_participant(&service, 3, Some(5.0));
    wait_for_children(&service, 2).await;

    service.expire_session(first.session.session_id());
    let err = first.handle.await.unwrap().unwrap_err();
    assert!(matches!(err, BarrierError::SessionLost { .. } | BarrierError::Listing { .. }));

    let third = spawn_participant(&service, 3, Some(7.0));
    let fourth = spawn_participant(&service, 3, Some(9.0));

    let outcome = second.handle.await.unwrap().unwrap();
    assert_eq!(outcome.node_name, "participant-0000000001");
    assert!(outcome.was_leader);
    assert_eq!(outcome.live_count, 3);

    // The new leader only fetched participants that joined after the handover;
    // its own value and the departed leader's value are not in the aggregate.
    let stats = outcome.statistics.unwrap();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.max, 9.0);
    assert_eq!(stats.min, 7.0);

    third.handle.await.unwrap().unwrap();
    fourth.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn departed_participant_is_not_counted() {
    let service = DeterministicCoordinationService::new();
    let first = spawn_participant(&service, 3, Some(1.0));
    wait_for_children(&service, 1).await;
    let second = spawn_participant(&service, 3, Some(2.0));
    wait_for_children(&service, 2).await;

    second.session.close().await.unwrap();
    let _ = second.handle.await.unwrap();
    assert_eq!(service.children(ROOT).len(), 1);

    let third = spawn_participant(&service, 3, Some(3.0));
    wait_for_children(&service, 2).await;
    assert!(!first.handle.is_finished());

    let fourth = spawn_participant(&service, 3, Some(4.0));
    let outcome = first.handle.await.unwrap().unwrap();
    assert_eq!(outcome.live_count, 3);
    assert!(outcome.was_leader);

    third.handle.await.unwrap().unwrap();
    fourth.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn late_joiner_passes_immediately() {
    let service = DeterministicCoordinationService::new();
    let early: Vec<Running> = (0..2).map(|_| spawn_participant(&service, 2, None)).collect();
    let mut early_outcomes = Vec::new();
    for r in early {
        early_outcomes.push(r.handle.await.unwrap().unwrap());
        // Passing does not close the session; the early nodes stay live.
        assert!(service.is_session_open(r.session.session_id()));
    }
    assert!(early_outcomes.iter().all(|o| o.live_count == 2));

    let late = spawn_participant(&service, 2, None);
    let outcome = late.handle.await.unwrap().unwrap();
    assert_eq!(outcome.live_count, 3);
    assert_eq!(outcome.rounds, 1);
    assert!(!outcome.was_leader);
}

#[tokio::test(start_paused = true)]
async fn never_passes_below_threshold() {
    let service = DeterministicCoordinationService::new();
    let session = Arc::new(service.connect());
    let participant = BarrierParticipant::new(session, BarrierConfig::new(ROOT, 2).with_value(1.0));
    let status = participant.subscribe();

    let result = tokio::time::timeout(Duration::from_secs(30), participant.enter()).await;
    assert!(result.is_err());

    let status = status.borrow().clone();
    assert_eq!(status.phase, BarrierPhase::Waiting);
    assert_eq!(status.live_count, 1);
    assert_eq!(status.to_string(), "1/2");
    assert!(status.is_leader);
}

#[tokio::test(start_paused = true)]
async fn three_of_five_wait_and_report_progress() {
    let service = DeterministicCoordinationService::new();
    let mut running = Vec::new();
    for (i, value) in [1.0, 2.0, 3.0].into_iter().enumerate() {
        running.push(spawn_participant(&service, 5, Some(value)));
        wait_for_children(&service, i + 1).await;
    }

    tokio::time::sleep(Duration::from_secs(30)).await;

    for (i, r) in running.iter().enumerate() {
        let status = r.status.borrow().clone();
        assert_eq!(status.to_string(), "3/5", "participant {i}");
        assert_eq!(status.phase, BarrierPhase::Waiting, "participant {i}");
        assert_eq!(status.is_leader, i == 0, "participant {i}");
        assert!(!r.handle.is_finished(), "participant {i}");
    }

    let stats = running[0].status.borrow().statistics.unwrap();
    assert_eq!(stats.count, 3);
    assert_eq!(stats.mean, 2.0);
    assert!(running[1..].iter().all(|r| r.status.borrow().statistics.is_none()));
}

#[tokio::test]
async fn zero_and_undecodable_values_count_toward_quorum_only() {
    let service = DeterministicCoordinationService::new();
    let leader = spawn_participant(&service, 4, Some(10.0));
    wait_for_children(&service, 1).await;

    let foreign = Arc::new(service.connect());
    foreign
        .create_node(&format!("{ROOT}/participant-"), b"{not json".to_vec(), CreateMode::EphemeralSequential)
        .await
        .unwrap();
    wait_for_children(&service, 2).await;

    let zero = spawn_participant(&service, 4, Some(0.0));
    wait_for_children(&service, 3).await;
    let last = spawn_participant(&service, 4, Some(30.0));

    let outcome = leader.handle.await.unwrap().unwrap();
    assert!(outcome.was_leader);
    assert_eq!(outcome.live_count, 4);

    let stats = outcome.statistics.unwrap();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.max, 30.0);
    assert_eq!(stats.min, 10.0);
    assert_eq!(stats.mean, 20.0);

    assert_eq!(zero.handle.await.unwrap().unwrap().live_count, 4);
    assert_eq!(last.handle.await.unwrap().unwrap().live_count, 4);
    assert!(service.is_session_open(foreign.session_id()));
}

#[tokio::test]
async fn registration_on_closed_session_fails() {
    let service = DeterministicCoordinationService::new();
    let session = Arc::new(service.connect());
    session.close().await.unwrap();

    let participant = BarrierParticipant::new(session, BarrierConfig::new(ROOT, 1));
    let err = participant.enter().await.unwrap_err();
    assert!(matches!(err, BarrierError::Registration { .. }));
    assert_eq!(participant.status().phase, BarrierPhase::Registering);
}
