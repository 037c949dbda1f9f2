//! In-memory implementation of [`CoordinationClient`] for testing.
//!
//! Provides a deterministic, non-persistent hierarchical store with sessions,
//! ephemeral and sequential nodes, and one-shot children watches. Several
//! sessions opened from the same [`DeterministicCoordinationService`] observe
//! one shared tree, which makes multi-participant scenarios reproducible
//! inside a single test process.
//!
//! # Limitations
//!
//! - No persistence across restarts
//! - Single-node only (no replication)
//! - Sessions never time out on their own; use
//!   [`DeterministicCoordinationService::expire_session`] to simulate a crash

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::CoordinationError;
use crate::path::ancestors_inclusive;
use crate::path::join_path;
use crate::path::parent_path;
use crate::path::sequential_path;
use crate::path::validate_path;
use crate::traits::CoordinationClient;
use crate::types::ChildrenWatch;
use crate::types::CreateMode;
use crate::types::WatchEvent;

struct Node {
    data: Vec<u8>,
    /// Owning session for ephemeral nodes.
    owner: Option<u64>,
    /// Next sequence number handed to a sequential child.
    next_sequence: u64,
}

impl Node {
    fn new(data: Vec<u8>, owner: Option<u64>) -> Self {
        Self {
            data,
            owner,
            next_sequence: 0,
        }
    }
}

struct PendingWatch {
    session_id: u64,
    tx: oneshot::Sender<WatchEvent>,
}

struct Tree {
    nodes: BTreeMap<String, Node>,
    child_watches: HashMap<String, Vec<PendingWatch>>,
    open_sessions: HashSet<u64>,
    next_session_id: u64,
}

impl Tree {
    fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::new(Vec::new(), None));
        Self {
            nodes,
            child_watches: HashMap::new(),
            open_sessions: HashSet::new(),
            next_session_id: 1,
        }
    }

    fn check_open(&self, session_id: u64) -> Result<(), CoordinationError> {
        if self.open_sessions.contains(&session_id) {
            Ok(())
        } else {
            Err(CoordinationError::SessionClosed { session_id })
        }
    }

    fn children(&self, path: &str) -> Vec<String> {
        let prefix = join_path(path, "");
        self.nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| &key[prefix.len()..])
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(str::to_string)
            .collect()
    }

    fn fire_child_watches(&mut self, parent: &str) {
        if let Some(watches) = self.child_watches.remove(parent) {
            for watch in watches {
                let _ = watch.tx.send(WatchEvent::ChildrenChanged {
                    path: parent.to_string(),
                });
            }
        }
    }

    fn end_session(&mut self, session_id: u64) {
        if !self.open_sessions.remove(&session_id) {
            return;
        }

        for watches in self.child_watches.values_mut() {
            let (closing, keep): (Vec<_>, Vec<_>) = watches.drain(..).partition(|w| w.session_id == session_id);
            *watches = keep;
            for watch in closing {
                let _ = watch.tx.send(WatchEvent::SessionClosed);
            }
        }

        let owned: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.owner == Some(session_id))
            .map(|(path, _)| path.clone())
            .collect();
        for path in owned {
            self.nodes.remove(&path);
            if let Some(parent) = parent_path(&path) {
                let parent = parent.to_string();
                self.fire_child_watches(&parent);
            }
        }
    }
}

/// In-memory deterministic coordination service.
///
/// # Example
///
/// ```ignore
/// use muster_core::{CoordinationClient, CreateMode, DeterministicCoordinationService};
///
/// let service = DeterministicCoordinationService::new();
/// let session = service.connect();
/// session.ensure_path("/barrier").await?;
/// let path = session
///     .create_node("/barrier/participant-", b"{}".to_vec(), CreateMode::EphemeralSequential)
///     .await?;
/// assert_eq!(path, "/barrier/participant-0000000000");
/// ```
pub struct DeterministicCoordinationService {
    tree: Mutex<Tree>,
}

impl DeterministicCoordinationService {
    /// Create a new, empty service containing only the root node.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tree: Mutex::new(Tree::new()),
        })
    }

    /// Open a new session.
    pub fn connect(self: &Arc<Self>) -> DeterministicSession {
        let mut tree = self.tree.lock();
        let session_id = tree.next_session_id;
        tree.next_session_id += 1;
        tree.open_sessions.insert(session_id);
        debug!(session_id, "deterministic session opened");
        DeterministicSession {
            service: Arc::clone(self),
            session_id,
        }
    }

    /// End a session as if its owner crashed.
    ///
    /// Its ephemeral nodes are deleted and the affected watches fire.
    pub fn expire_session(&self, session_id: u64) {
        debug!(session_id, "expiring deterministic session");
        self.tree.lock().end_session(session_id);
    }

    /// Child names of `path`, sorted.
    pub fn children(&self, path: &str) -> Vec<String> {
        self.tree.lock().children(path)
    }

    /// Number of nodes in the tree, excluding the root.
    pub fn node_count(&self) -> usize {
        self.tree.lock().nodes.len().saturating_sub(1)
    }

    /// Returns true if the session is still open.
    pub fn is_session_open(&self, session_id: u64) -> bool {
        self.tree.lock().open_sessions.contains(&session_id)
    }
}

/// A session on a [`DeterministicCoordinationService`].
pub struct DeterministicSession {
    service: Arc<DeterministicCoordinationService>,
    session_id: u64,
}

impl DeterministicSession {
    /// The service this session belongs to.
    pub fn service(&self) -> &Arc<DeterministicCoordinationService> {
        &self.service
    }
}

#[async_trait]
impl CoordinationClient for DeterministicSession {
    fn session_id(&self) -> u64 {
        self.session_id
    }

    async fn ensure_path(&self, path: &str) -> Result<(), CoordinationError> {
        validate_path(path)?;
        let mut tree = self.service.tree.lock();
        tree.check_open(self.session_id)?;

        for ancestor in ancestors_inclusive(path) {
            if tree.nodes.contains_key(&ancestor) {
                continue;
            }
            tree.nodes.insert(ancestor.clone(), Node::new(Vec::new(), None));
            if let Some(parent) = parent_path(&ancestor) {
                let parent = parent.to_string();
                tree.fire_child_watches(&parent);
            }
        }
        Ok(())
    }

    async fn create_node(
        &self,
        path_prefix: &str,
        data: Vec<u8>,
        mode: CreateMode,
    ) -> Result<String, CoordinationError> {
        let mut tree = self.service.tree.lock();
        tree.check_open(self.session_id)?;

        let parent = match parent_path(path_prefix) {
            Some(parent) => parent.to_string(),
            None => {
                return Err(CoordinationError::InvalidPath {
                    path: path_prefix.to_string(),
                    reason: "cannot create the root node".to_string(),
                });
            }
        };
        let parent_node = tree.nodes.get_mut(&parent).ok_or_else(|| CoordinationError::NoNode {
            path: parent.clone(),
        })?;

        let path = if mode.is_sequential() {
            let sequence = parent_node.next_sequence;
            parent_node.next_sequence = parent_node.next_sequence.saturating_add(1);
            sequential_path(path_prefix, sequence)
        } else {
            path_prefix.to_string()
        };
        validate_path(&path)?;

        if tree.nodes.contains_key(&path) {
            return Err(CoordinationError::NodeExists { path });
        }

        let owner = mode.is_ephemeral().then_some(self.session_id);
        tree.nodes.insert(path.clone(), Node::new(data, owner));
        tree.fire_child_watches(&parent);

        debug!(session_id = self.session_id, path = %path, mode = %mode, "node created");
        Ok(path)
    }

    async fn get_children_and_watch(&self, path: &str) -> Result<(Vec<String>, ChildrenWatch), CoordinationError> {
        validate_path(path)?;
        let mut tree = self.service.tree.lock();
        tree.check_open(self.session_id)?;

        if !tree.nodes.contains_key(path) {
            return Err(CoordinationError::NoNode { path: path.to_string() });
        }

        let children = tree.children(path);
        let (tx, watch) = ChildrenWatch::channel();
        tree.child_watches.entry(path.to_string()).or_default().push(PendingWatch {
            session_id: self.session_id,
            tx,
        });
        Ok((children, watch))
    }

    async fn get_data(&self, path: &str) -> Result<Vec<u8>, CoordinationError> {
        validate_path(path)?;
        let tree = self.service.tree.lock();
        tree.check_open(self.session_id)?;

        tree.nodes
            .get(path)
            .map(|node| node.data.clone())
            .ok_or_else(|| CoordinationError::NoNode { path: path.to_string() })
    }

    async fn close(&self) -> Result<(), CoordinationError> {
        debug!(session_id = self.session_id, "closing deterministic session");
        self.service.tree.lock().end_session(self.session_id);
        Ok(())
    }
}
