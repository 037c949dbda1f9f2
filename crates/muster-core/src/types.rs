//! Shared types for the coordination service interface.

use std::fmt;

use tokio::sync::oneshot;

/// How a node is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreateMode {
    /// Survives the creating session.
    Persistent,
    /// Deleted automatically when the creating session ends.
    Ephemeral,
    /// Persistent, with a service-assigned sequence suffix.
    PersistentSequential,
    /// Ephemeral, with a service-assigned sequence suffix.
    EphemeralSequential,
}

impl CreateMode {
    /// Returns true if the node is bound to the creating session.
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, CreateMode::Ephemeral | CreateMode::EphemeralSequential)
    }

    /// Returns true if the service appends a sequence suffix to the name.
    pub fn is_sequential(&self) -> bool {
        matches!(self, CreateMode::PersistentSequential | CreateMode::EphemeralSequential)
    }

    /// Convert the mode to a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CreateMode::Persistent => "persistent",
            CreateMode::Ephemeral => "ephemeral",
            CreateMode::PersistentSequential => "persistent_sequential",
            CreateMode::EphemeralSequential => "ephemeral_sequential",
        }
    }
}

impl fmt::Display for CreateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification delivered to a [`ChildrenWatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A child was created or deleted under `path`.
    ChildrenChanged {
        /// The watched parent path.
        path: String,
    },
    /// The session that registered the watch ended before any change.
    SessionClosed,
}

/// One-shot subscription to the next children change under a path.
///
/// Fires at most once. To keep observing, list the children again with a
/// new watch after this one fires.
#[derive(Debug)]
pub struct ChildrenWatch {
    rx: oneshot::Receiver<WatchEvent>,
}

impl ChildrenWatch {
    /// Create a watch and the sender used by a backend to fire it.
    pub fn channel() -> (oneshot::Sender<WatchEvent>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// Wait for the watch to fire.
    ///
    /// A backend that drops the sender without firing is reported as
    /// [`WatchEvent::SessionClosed`].
    pub async fn changed(self) -> WatchEvent {
        self.rx.await.unwrap_or(WatchEvent::SessionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_mode_flags() {
        assert!(CreateMode::EphemeralSequential.is_ephemeral());
        assert!(CreateMode::EphemeralSequential.is_sequential());
        assert!(CreateMode::Ephemeral.is_ephemeral());
        assert!(!CreateMode::Ephemeral.is_sequential());
        assert!(!CreateMode::PersistentSequential.is_ephemeral());
        assert!(!CreateMode::Persistent.is_sequential());
        assert_eq!(CreateMode::EphemeralSequential.to_string(), "ephemeral_sequential");
    }

    #[tokio::test]
    async fn watch_delivers_event() {
        let (tx, watch) = ChildrenWatch::channel();
        tx.send(WatchEvent::ChildrenChanged {
            path: "/barrier".to_string(),
        })
        .unwrap();
        assert_eq!(watch.changed().await, WatchEvent::ChildrenChanged {
            path: "/barrier".to_string()
        });
    }

    #[tokio::test]
    async fn dropped_sender_reads_as_session_closed() {
        let (tx, watch) = ChildrenWatch::channel();
        drop(tx);
        assert_eq!(watch.changed().await, WatchEvent::SessionClosed);
    }
}
