//! Core traits for muster.
//!
//! Defines the interface to the hierarchical coordination service.

use async_trait::async_trait;

use crate::error::CoordinationError;
use crate::types::ChildrenWatch;
use crate::types::CreateMode;

/// Session-oriented client to a hierarchical coordination service.
///
/// One value represents one session. Ephemeral nodes created through it are
/// removed by the service when the session ends, whether by [`close`] or by
/// expiry after a crash or disconnect.
///
/// [`close`]: CoordinationClient::close
#[async_trait]
pub trait CoordinationClient: Send + Sync {
    /// Identifier of the session behind this client.
    fn session_id(&self) -> u64;

    /// Create `path` and any missing ancestors. Succeeds if it already exists.
    async fn ensure_path(&self, path: &str) -> Result<(), CoordinationError>;

    /// Create a node and return its assigned path.
    ///
    /// For sequential modes the returned path is `path_prefix` followed by a
    /// zero-padded, per-parent, strictly increasing sequence number.
    async fn create_node(&self, path_prefix: &str, data: Vec<u8>, mode: CreateMode)
    -> Result<String, CoordinationError>;

    /// List the child names of `path` and arm a one-shot watch for the next
    /// children change.
    async fn get_children_and_watch(&self, path: &str) -> Result<(Vec<String>, ChildrenWatch), CoordinationError>;

    /// Read the payload stored at `path`.
    async fn get_data(&self, path: &str) -> Result<Vec<u8>, CoordinationError>;

    /// End the session. Ephemeral nodes owned by it are deleted.
    async fn close(&self) -> Result<(), CoordinationError>;
}

// Blanket implementation for Arc<T>
#[async_trait]
impl<T: CoordinationClient + ?Sized> CoordinationClient for std::sync::Arc<T> {
    fn session_id(&self) -> u64 {
        (**self).session_id()
    }

    async fn ensure_path(&self, path: &str) -> Result<(), CoordinationError> {
        (**self).ensure_path(path).await
    }

    async fn create_node(
        &self,
        path_prefix: &str,
        data: Vec<u8>,
        mode: CreateMode,
    ) -> Result<String, CoordinationError> {
        (**self).create_node(path_prefix, data, mode).await
    }

    async fn get_children_and_watch(&self, path: &str) -> Result<(Vec<String>, ChildrenWatch), CoordinationError> {
        (**self).get_children_and_watch(path).await
    }

    async fn get_data(&self, path: &str) -> Result<Vec<u8>, CoordinationError> {
        (**self).get_data(path).await
    }

    async fn close(&self) -> Result<(), CoordinationError> {
        (**self).close().await
    }
}
