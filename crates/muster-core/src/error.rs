//! Error types for coordination service operations.

use snafu::Snafu;

/// Errors surfaced by a [`CoordinationClient`](crate::CoordinationClient).
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum CoordinationError {
    /// The node (or the parent of a node being created) does not exist.
    #[snafu(display("node '{path}' does not exist"))]
    NoNode {
        /// The missing path.
        path: String,
    },

    /// A non-sequential create targeted an existing node.
    #[snafu(display("node '{path}' already exists"))]
    NodeExists {
        /// The existing path.
        path: String,
    },

    /// The path is not a valid absolute node path.
    #[snafu(display("invalid path '{path}': {reason}"))]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The session was closed or expired; no further operations are possible.
    #[snafu(display("session {session_id} is closed"))]
    SessionClosed {
        /// Identifier of the closed session.
        session_id: u64,
    },

    /// The service did not accept the operation within the retry budget.
    #[snafu(display("{operation} gave up after {attempts} attempts"))]
    RetriesExhausted {
        /// Description of the operation.
        operation: String,
        /// Number of attempts made.
        attempts: u32,
    },

    /// Transport or server failure reported by the backend.
    #[snafu(display("coordination backend error: {reason}"))]
    Backend {
        /// Backend-provided description.
        reason: String,
    },
}

impl CoordinationError {
    /// Returns true if the error means the target node is absent.
    pub fn is_no_node(&self) -> bool {
        matches!(self, CoordinationError::NoNode { .. })
    }

    /// Returns true if the error means the node already exists.
    pub fn is_node_exists(&self) -> bool {
        matches!(self, CoordinationError::NodeExists { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_node_display() {
        let err = CoordinationError::NoNode {
            path: "/barrier/participant-0000000001".to_string(),
        };
        assert_eq!(err.to_string(), "node '/barrier/participant-0000000001' does not exist");
        assert!(err.is_no_node());
        assert!(!err.is_node_exists());
    }

    #[test]
    fn invalid_path_display() {
        let err = CoordinationError::InvalidPath {
            path: "barrier".to_string(),
            reason: "path must start with '/'".to_string(),
        };
        assert_eq!(err.to_string(), "invalid path 'barrier': path must start with '/'");
    }

    #[test]
    fn session_closed_display() {
        let err = CoordinationError::SessionClosed { session_id: 7 };
        assert_eq!(err.to_string(), "session 7 is closed");
    }

    #[test]
    fn retries_exhausted_display() {
        let err = CoordinationError::RetriesExhausted {
            operation: "sequential create".to_string(),
            attempts: 100,
        };
        assert_eq!(err.to_string(), "sequential create gave up after 100 attempts");
    }

    #[test]
    fn equality() {
        let a = CoordinationError::NodeExists { path: "/a".to_string() };
        let b = CoordinationError::NodeExists { path: "/a".to_string() };
        let c = CoordinationError::Backend {
            reason: "connection refused".to_string(),
        };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
