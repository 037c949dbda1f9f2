//! Leader-side metadata aggregation.
//!
//! Only the round's leader reads peer payloads, and only for participants it
//! has not seen in the previous listing. Everyone else never fetches peer
//! data, so non-leaders keep an empty cache. A participant that becomes
//! leader after a handover starts from its own (empty) cache as well.

use std::collections::BTreeMap;
use std::time::Duration;
use std::time::Instant;

use futures::future::join_all;
use muster_core::CoordinationClient;
use muster_core::path::join_path;
use tracing::info;
use tracing::warn;

use crate::error::BarrierError;
use crate::error::MetadataError;
use crate::payload::ParticipantPayload;
use crate::pure::AggregateStats;
use crate::pure::compute_statistics;
use crate::pure::countable_value;

/// Result of one aggregation round.
#[derive(Debug)]
pub struct AggregationReport {
    /// Statistics over every live child with a counted value.
    pub statistics: Option<AggregateStats>,
    /// Newly observed participants and the metadata read for them.
    pub added: Vec<(String, Option<ParticipantPayload>)>,
    /// Participants left out of the cache this round.
    pub skipped: Vec<MetadataError>,
    /// Time spent fetching metadata.
    pub fetch_elapsed: Duration,
}

/// Fetches and accumulates peer metadata for the leader.
#[derive(Debug)]
pub struct LeaderAggregator {
    root_path: String,
    cache: BTreeMap<String, ParticipantPayload>,
}

impl LeaderAggregator {
    /// Create an aggregator with an empty cache.
    pub fn new(root_path: impl Into<String>) -> Self {
        Self {
            root_path: root_path.into(),
            cache: BTreeMap::new(),
        }
    }

    /// Metadata known for `node`.
    pub fn metadata(&self, node: &str) -> Option<&ParticipantPayload> {
        self.cache.get(node)
    }

    /// Number of cached participants.
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Fetch metadata for `added`, cache it, and recompute statistics over
    /// `children`.
    ///
    /// Fetches run concurrently and are joined before the cache is touched.
    /// A participant that left before its fetch, or whose payload does not
    /// decode, is skipped. Any other fetch failure rejects the round.
    pub async fn aggregate<C: CoordinationClient + ?Sized>(
        &mut self,
        client: &C,
        added: &[String],
        children: &[String],
    ) -> Result<AggregationReport, BarrierError> {
        let started = Instant::now();

        let fetches = added.iter().map(|node| {
            let path = join_path(&self.root_path, node);
            async move {
                let result = client.get_data(&path).await;
                (node, path, result)
            }
        });
        let results = join_all(fetches).await;

        let mut skipped = Vec::new();
        for (node, path, result) in results {
            match result {
                Ok(bytes) => match ParticipantPayload::decode(&bytes) {
                    Ok(payload) => {
                        self.cache.insert(node.clone(), payload);
                    }
                    Err(source) => skipped.push(MetadataError::Decode {
                        node: node.clone(),
                        source,
                    }),
                },
                Err(e) if e.is_no_node() => skipped.push(MetadataError::Vanished { node: node.clone() }),
                Err(source) => return Err(BarrierError::Fetch { path, source }),
            }
        }
        for err in &skipped {
            warn!(node = %err.node(), error = %err, "participant left out of aggregate");
        }

        let statistics = compute_statistics(
            children
                .iter()
                .filter_map(|child| self.cache.get(child))
                .filter_map(|payload| countable_value(payload.participant_value)),
        );
        let fetch_elapsed = started.elapsed();

        match statistics {
            Some(stats) => info!(
                participants = stats.count,
                max = stats.max,
                min = stats.min,
                mean = stats.mean,
                "aggregate statistics"
            ),
            None => info!("aggregate statistics: no counted values"),
        }

        let added: Vec<(String, Option<ParticipantPayload>)> =
            added.iter().map(|node| (node.clone(), self.cache.get(node).cloned())).collect();
        for (node, payload) in &added {
            info!(node = %node, metadata = ?payload, "new participant");
        }
        info!(
            added = added.len(),
            elapsed = format_args!("{:.1}s", fetch_elapsed.as_secs_f64()),
            "metadata round complete"
        );

        Ok(AggregationReport {
            statistics,
            added,
            skipped,
            fetch_elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use muster_core::CreateMode;
    use muster_core::DeterministicCoordinationService;
    use muster_core::DeterministicSession;

    use super::*;

    async fn seed(service: &Arc<DeterministicCoordinationService>, data: &[u8]) -> (DeterministicSession, String) {
        let session = service.connect();
        session.ensure_path("/barrier").await.unwrap();
        let path = session
            .create_node("/barrier/participant-", data.to_vec(), CreateMode::EphemeralSequential)
            .await
            .unwrap();
        let name = muster_core::path::leaf_name(&path).to_string();
        (session, name)
    }

    #[tokio::test]
    async fn caches_added_and_computes_stats_over_children() {
        let service = DeterministicCoordinationService::new();
        let (_a, a) = seed(&service, br#"{"participantValue":10}"#).await;
        let (_b, b) = seed(&service, br#"{"participantValue":30}"#).await;
        let leader = service.connect();

        let mut aggregator = LeaderAggregator::new("/barrier");
        let children = vec![a.clone(), b.clone()];
        let report = aggregator.aggregate(&leader, &children, &children).await.unwrap();

        assert_eq!(aggregator.cached_count(), 2);
        assert_eq!(report.statistics.unwrap().mean, 20.0);
        assert_eq!(report.added.len(), 2);
        assert!(report.skipped.is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_is_skipped() {
        let service = DeterministicCoordinationService::new();
        let (_a, a) = seed(&service, b"{broken").await;
        let (_b, b) = seed(&service, br#"{"participantValue":4}"#).await;
        let leader = service.connect();

        let mut aggregator = LeaderAggregator::new("/barrier");
        let children = vec![a.clone(), b];
        let report = aggregator.aggregate(&leader, &children, &children).await.unwrap();

        assert_eq!(aggregator.cached_count(), 1);
        assert!(aggregator.metadata(&a).is_none());
        assert_eq!(report.skipped.len(), 1);
        assert!(matches!(&report.skipped[0], MetadataError::Decode { node, .. } if *node == a));
        assert_eq!(report.statistics.unwrap().count, 1);
    }

    #[tokio::test]
    async fn departed_participant_is_skipped() {
        let service = DeterministicCoordinationService::new();
        let leader = service.connect();
        leader.ensure_path("/barrier").await.unwrap();

        let mut aggregator = LeaderAggregator::new("/barrier");
        let gone = vec!["participant-0000000009".to_string()];
        let report = aggregator.aggregate(&leader, &gone, &gone).await.unwrap();

        assert!(report.statistics.is_none());
        assert!(matches!(report.skipped[0], MetadataError::Vanished { .. }));
    }

    #[tokio::test]
    async fn session_failure_rejects_the_round() {
        let service = DeterministicCoordinationService::new();
        let (_a, a) = seed(&service, br#"{"participantValue":1}"#).await;
        let leader = service.connect();
        leader.close().await.unwrap();

        let mut aggregator = LeaderAggregator::new("/barrier");
        let children = vec![a];
        let err = aggregator.aggregate(&leader, &children, &children).await.unwrap_err();
        assert!(matches!(err, BarrierError::Fetch { .. }));
    }
}
