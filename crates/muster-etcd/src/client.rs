//! [`CoordinationClient`] over etcd.
//!
//! | Coordination concept | etcd mapping |
//! |---|---|
//! | session | lease renewed by a keep-alive task |
//! | ephemeral node | key attached to the session lease |
//! | sequential node | counter key bumped in the same transaction as the put |
//! | children watch | prefix watch from the listing revision, cancelled after the first change |

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use etcd_client::Client;
use etcd_client::Compare;
use etcd_client::CompareOp;
use etcd_client::Event;
use etcd_client::EventType;
use etcd_client::GetOptions;
use etcd_client::LeaseKeepAliveStream;
use etcd_client::LeaseKeeper;
use etcd_client::PutOptions;
use etcd_client::Txn;
use etcd_client::TxnOp;
use etcd_client::WatchOptions;
use etcd_client::WatchStream;
use etcd_client::Watcher;
use muster_core::ChildrenWatch;
use muster_core::CoordinationClient;
use muster_core::CoordinationError;
use muster_core::CreateMode;
use muster_core::WatchEvent;
use muster_core::path::ancestors_inclusive;
use muster_core::path::parent_path;
use muster_core::path::sequential_path;
use muster_core::path::validate_path;
use snafu::ResultExt;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::EtcdConfig;
use crate::error::ConnectSnafu;
use crate::error::EtcdError;
use crate::error::GrantLeaseSnafu;
use crate::error::KeepAliveSnafu;
use crate::error::backend;
use crate::keys::MAX_CAS_RETRIES;
use crate::keys::children_prefix;
use crate::keys::direct_child;
use crate::keys::parse_counter;
use crate::keys::sequence_key;

/// One etcd session.
pub struct EtcdCoordinationClient {
    client: Client,
    lease_id: i64,
    /// Cancelled on close or when the lease is lost.
    session: CancellationToken,
    closed: AtomicBool,
}

impl EtcdCoordinationClient {
    /// Connect, grant the session lease and start renewing it.
    pub async fn connect(config: &EtcdConfig) -> Result<Self, EtcdError> {
        let mut client = Client::connect(config.endpoints.clone(), None).await.context(ConnectSnafu {
            endpoints: config.endpoints.join(", "),
        })?;

        let ttl_secs = i64::try_from(config.session_ttl_secs).unwrap_or(i64::MAX);
        let lease_id = client.lease_grant(ttl_secs, None).await.context(GrantLeaseSnafu { ttl_secs })?.id();
        let (keeper, stream) = client.lease_keep_alive(lease_id).await.context(KeepAliveSnafu { lease_id })?;

        let session = CancellationToken::new();
        tokio::spawn(keep_alive(keeper, stream, config.keep_alive_interval(), session.clone(), lease_id));

        info!(lease_id, ttl_secs, endpoints = ?config.endpoints, "etcd session established");
        Ok(Self {
            client,
            lease_id,
            session,
            closed: AtomicBool::new(false),
        })
    }

    /// The session lease.
    pub fn lease_id(&self) -> i64 {
        self.lease_id
    }

    fn check_open(&self) -> Result<(), CoordinationError> {
        if self.closed.load(Ordering::Acquire) || self.session.is_cancelled() {
            return Err(CoordinationError::SessionClosed {
                session_id: self.session_id(),
            });
        }
        Ok(())
    }

    async fn require_node(&self, client: &mut Client, path: &str) -> Result<(), CoordinationError> {
        if path == "/" {
            return Ok(());
        }
        let resp = client.get(path, None).await.map_err(backend)?;
        if resp.kvs().is_empty() {
            return Err(CoordinationError::NoNode { path: path.to_string() });
        }
        Ok(())
    }

    async fn create_plain(
        &self,
        client: &mut Client,
        path: &str,
        parent: &str,
        data: Vec<u8>,
        options: Option<PutOptions>,
    ) -> Result<String, CoordinationError> {
        let mut compares = vec![Compare::version(path, CompareOp::Equal, 0)];
        if parent != "/" {
            compares.push(Compare::version(parent, CompareOp::Greater, 0));
        }
        let txn = Txn::new().when(compares).and_then(vec![TxnOp::put(path, data, options)]);

        if client.txn(txn).await.map_err(backend)?.succeeded() {
            debug!(path, "created node");
            return Ok(path.to_string());
        }
        self.require_node(client, parent).await?;
        Err(CoordinationError::NodeExists { path: path.to_string() })
    }

    async fn create_sequential(
        &self,
        client: &mut Client,
        path_prefix: &str,
        parent: &str,
        data: Vec<u8>,
        options: Option<PutOptions>,
    ) -> Result<String, CoordinationError> {
        let counter_key = sequence_key(parent);

        for attempt in 0..MAX_CAS_RETRIES {
            let resp = client.get(counter_key.as_str(), None).await.map_err(backend)?;
            let (sequence, version) = match resp.kvs().first() {
                Some(kv) => (parse_counter(&counter_key, kv.value())?, kv.version()),
                None => (0, 0),
            };
            let path = sequential_path(path_prefix, sequence);

            let mut compares = vec![
                Compare::version(counter_key.as_str(), CompareOp::Equal, version),
                Compare::version(path.as_str(), CompareOp::Equal, 0),
            ];
            if parent != "/" {
                compares.push(Compare::version(parent, CompareOp::Greater, 0));
            }
            let txn = Txn::new().when(compares).and_then(vec![
                TxnOp::put(counter_key.as_str(), sequence.saturating_add(1).to_string(), None),
                TxnOp::put(path.as_str(), data.clone(), options.clone()),
            ]);

            if client.txn(txn).await.map_err(backend)?.succeeded() {
                debug!(path = %path, attempt, "created sequential node");
                return Ok(path);
            }
            self.require_node(client, parent).await?;
            debug!(counter = %counter_key, attempt, "sequence counter contended");
        }

        Err(CoordinationError::RetriesExhausted {
            operation: format!("sequential create under '{parent}'"),
            attempts: MAX_CAS_RETRIES,
        })
    }
}

#[async_trait]
impl CoordinationClient for EtcdCoordinationClient {
    fn session_id(&self) -> u64 {
        self.lease_id as u64
    }

    async fn ensure_path(&self, path: &str) -> Result<(), CoordinationError> {
        validate_path(path)?;
        self.check_open()?;

        let mut client = self.client.clone();
        for ancestor in ancestors_inclusive(path) {
            let txn = Txn::new()
                .when(vec![Compare::version(ancestor.as_str(), CompareOp::Equal, 0)])
                .and_then(vec![TxnOp::put(ancestor.as_str(), Vec::new(), None)]);
            if client.txn(txn).await.map_err(backend)?.succeeded() {
                debug!(path = %ancestor, "created path");
            }
        }
        Ok(())
    }

    async fn create_node(&self, path_prefix: &str, data: Vec<u8>, mode: CreateMode) -> Result<String, CoordinationError> {
        validate_path(path_prefix)?;
        self.check_open()?;

        let parent = parent_path(path_prefix).ok_or_else(|| CoordinationError::InvalidPath {
            path: path_prefix.to_string(),
            reason: "cannot create the root".to_string(),
        })?;
        let options = mode.is_ephemeral().then(|| PutOptions::new().with_lease(self.lease_id));

        let mut client = self.client.clone();
        if mode.is_sequential() {
            self.create_sequential(&mut client, path_prefix, parent, data, options).await
        } else {
            self.create_plain(&mut client, path_prefix, parent, data, options).await
        }
    }

    async fn get_children_and_watch(&self, path: &str) -> Result<(Vec<String>, ChildrenWatch), CoordinationError> {
        validate_path(path)?;
        self.check_open()?;

        let mut client = self.client.clone();
        self.require_node(&mut client, path).await?;

        let prefix = children_prefix(path);
        let resp = client
            .get(prefix.as_str(), Some(GetOptions::new().with_prefix().with_keys_only()))
            .await
            .map_err(backend)?;
        let children: Vec<String> =
            resp.kvs().iter().filter_map(|kv| direct_child(&prefix, kv.key())).map(str::to_string).collect();
        let revision = resp.header().map(|header| header.revision()).unwrap_or(0);

        let options = WatchOptions::new().with_prefix().with_start_revision(revision + 1);
        let (watcher, stream) = client.watch(prefix.as_str(), Some(options)).await.map_err(backend)?;

        let (tx, watch) = ChildrenWatch::channel();
        tokio::spawn(forward_first_change(path.to_string(), prefix, watcher, stream, tx, self.session.clone()));

        debug!(path, children = children.len(), revision, "listed children");
        Ok((children, watch))
    }

    async fn get_data(&self, path: &str) -> Result<Vec<u8>, CoordinationError> {
        validate_path(path)?;
        self.check_open()?;

        let mut client = self.client.clone();
        let resp = client.get(path, None).await.map_err(backend)?;
        match resp.kvs().first() {
            Some(kv) => Ok(kv.value().to_vec()),
            None => Err(CoordinationError::NoNode { path: path.to_string() }),
        }
    }

    async fn close(&self) -> Result<(), CoordinationError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.session.cancel();

        let mut client = self.client.clone();
        client.lease_revoke(self.lease_id).await.map_err(backend)?;
        info!(lease_id = self.lease_id, "etcd session closed");
        Ok(())
    }
}

/// Renew the lease until the session is cancelled. Losing the lease cancels
/// the session.
async fn keep_alive(
    mut keeper: LeaseKeeper,
    mut stream: LeaseKeepAliveStream,
    interval: Duration,
    session: CancellationToken,
    lease_id: i64,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = session.cancelled() => {
                debug!(lease_id, "lease keep-alive stopped");
                return;
            }
            _ = ticker.tick() => {}
        }

        if let Err(err) = keeper.keep_alive().await {
            warn!(lease_id, error = %err, "lease keep-alive failed");
            session.cancel();
            return;
        }
        match stream.message().await {
            Ok(Some(resp)) if resp.ttl() > 0 => debug!(lease_id, ttl = resp.ttl(), "lease renewed"),
            Ok(_) => {
                warn!(lease_id, "session lease expired");
                session.cancel();
                return;
            }
            Err(err) => {
                warn!(lease_id, error = %err, "lease keep-alive stream failed");
                session.cancel();
                return;
            }
        }
    }
}

/// A child created or deleted directly under `prefix`.
fn is_children_change(prefix: &str, event: &Event) -> bool {
    let Some(kv) = event.kv() else {
        return false;
    };
    if direct_child(prefix, kv.key()).is_none() {
        return false;
    }
    match event.event_type() {
        EventType::Delete => true,
        EventType::Put => kv.version() == 1,
    }
}

/// Deliver the first children change under `prefix` to the one-shot watch,
/// then cancel the etcd watch.
async fn forward_first_change(
    path: String,
    prefix: String,
    mut watcher: Watcher,
    mut stream: WatchStream,
    mut tx: oneshot::Sender<WatchEvent>,
    session: CancellationToken,
) {
    let event = loop {
        tokio::select! {
            _ = session.cancelled() => break Some(WatchEvent::SessionClosed),
            // Receiver dropped: the barrier stopped watching.
            _ = tx.closed() => break None,
            message = stream.message() => match message {
                Ok(Some(resp)) => {
                    if resp.canceled() || resp.events().iter().any(|event| is_children_change(&prefix, event)) {
                        break Some(WatchEvent::ChildrenChanged { path: path.clone() });
                    }
                }
                // A lost stream is reported as a change; the re-list surfaces any real failure.
                Ok(None) => break Some(WatchEvent::ChildrenChanged { path: path.clone() }),
                Err(err) => {
                    warn!(path = %path, error = %err, "children watch stream failed");
                    break Some(WatchEvent::ChildrenChanged { path: path.clone() });
                }
            },
        }
    };

    if let Some(event) = event {
        let _ = tx.send(event);
    }
    if let Err(err) = watcher.cancel().await {
        debug!(path = %path, error = %err, "failed to cancel children watch");
    }
}
