//! etcd backend for the muster coordination interface.
//!
//! A session is an etcd lease kept alive in the background. Ephemeral nodes
//! are keys attached to that lease, so they vanish when the process closes
//! the session or stops renewing it.
//!
//! ```ignore
//! let client = EtcdCoordinationClient::connect(&EtcdConfig::default()).await?;
//! client.ensure_path("/barrier").await?;
//! ```

mod client;
mod config;
mod error;
pub mod keys;

pub use client::EtcdCoordinationClient;
pub use config::DEFAULT_ETCD_ENDPOINT;
pub use config::DEFAULT_SESSION_TTL_SECS;
pub use config::EtcdConfig;
pub use error::EtcdError;
