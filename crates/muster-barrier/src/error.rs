//! Error types for the barrier protocol.
//!
//! Two levels:
//!
//! - [`BarrierError`] rejects the whole barrier attempt. The caller closes the
//!   session and exits with failure.
//! - [`MetadataError`] concerns one peer's payload. It is logged where it
//!   happens and the peer is left out of the aggregate; it never fails a round.

use muster_core::CoordinationError;
use snafu::Snafu;

/// Attempt-level barrier failure.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum BarrierError {
    /// Root path or participant node creation was rejected.
    #[snafu(display("failed to register participant under '{root_path}': {source}"))]
    Registration {
        /// Barrier root path.
        root_path: String,
        /// The underlying service error.
        source: CoordinationError,
    },

    /// The participant payload could not be serialized.
    #[snafu(display("failed to encode participant payload: {source}"))]
    EncodePayload {
        /// The underlying serialization error.
        source: serde_json::Error,
    },

    /// Listing the barrier children failed.
    #[snafu(display("failed to list children of '{path}': {source}"))]
    Listing {
        /// The barrier root path.
        path: String,
        /// The underlying service error.
        source: CoordinationError,
    },

    /// Reading a participant's metadata failed for a reason other than the
    /// participant having left.
    #[snafu(display("failed to fetch metadata from '{path}': {source}"))]
    Fetch {
        /// The participant node path.
        path: String,
        /// The underlying service error.
        source: CoordinationError,
    },

    /// The session ended while a children watch was pending.
    #[snafu(display("session closed while waiting on barrier '{path}'"))]
    SessionLost {
        /// The barrier root path.
        path: String,
    },
}

/// Peer-level failure reading one participant's metadata.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetadataError {
    /// The participant left between the listing and the fetch.
    #[snafu(display("participant '{node}' left before its metadata was read"))]
    Vanished {
        /// Participant node name.
        node: String,
    },

    /// The participant's payload is not a valid metadata record.
    #[snafu(display("participant '{node}' has malformed metadata: {source}"))]
    Decode {
        /// Participant node name.
        node: String,
        /// The underlying decode error.
        source: serde_json::Error,
    },
}

impl MetadataError {
    /// Name of the participant the error refers to.
    pub fn node(&self) -> &str {
        match self {
            MetadataError::Vanished { node } | MetadataError::Decode { node, .. } => node,
        }
    }
}
