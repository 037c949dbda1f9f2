//! Session establishment errors.
//!
//! Failures of individual operations on an open session are reported as
//! [`muster_core::CoordinationError::Backend`].

use muster_core::CoordinationError;
use snafu::Snafu;

/// Failure to open an etcd session.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EtcdError {
    /// No endpoint accepted the connection.
    #[snafu(display("unable to connect to etcd at {endpoints}: {source}"))]
    Connect {
        /// Comma-separated endpoint list.
        endpoints: String,
        /// The underlying client error.
        source: etcd_client::Error,
    },

    /// The session lease could not be granted.
    #[snafu(display("failed to grant a {ttl_secs}s session lease: {source}"))]
    GrantLease {
        /// Requested TTL.
        ttl_secs: i64,
        /// The underlying client error.
        source: etcd_client::Error,
    },

    /// The lease keep-alive stream could not be opened.
    #[snafu(display("failed to start keep-alive for lease {lease_id}: {source}"))]
    KeepAlive {
        /// The session lease.
        lease_id: i64,
        /// The underlying client error.
        source: etcd_client::Error,
    },
}

/// Map a client error on an open session.
pub(crate) fn backend(err: etcd_client::Error) -> CoordinationError {
    CoordinationError::Backend {
        reason: err.to_string(),
    }
}
