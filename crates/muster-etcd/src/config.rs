//! etcd connection settings.

use std::time::Duration;

/// Default etcd endpoint.
pub const DEFAULT_ETCD_ENDPOINT: &str = "http://127.0.0.1:2379";

/// Default session (lease) time-to-live in seconds.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 10;

/// Connection settings for [`crate::EtcdCoordinationClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtcdConfig {
    /// etcd endpoints, tried by the client in order.
    pub endpoints: Vec<String>,
    /// Lease TTL. A crashed participant's node disappears at most this long
    /// after its last keep-alive.
    pub session_ttl_secs: u64,
}

impl Default for EtcdConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![DEFAULT_ETCD_ENDPOINT.to_string()],
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
        }
    }
}

impl EtcdConfig {
    /// Lease TTL as a duration.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Interval between lease renewals: a third of the TTL.
    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs.max(1)) / 3
    }
}
