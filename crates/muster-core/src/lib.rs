//! Coordination service interface for muster.
//!
//! Muster participants talk to a hierarchical, session-oriented coordination
//! service (ZooKeeper-like: paths, ephemeral nodes, sequential names, one-shot
//! children watches). This crate defines that boundary:
//!
//! - [`CoordinationClient`] - the async trait every backend implements
//! - [`CreateMode`], [`ChildrenWatch`], [`WatchEvent`] - node and watch types
//! - [`CoordinationError`] - errors surfaced by backends
//! - [`DeterministicCoordinationService`] - in-memory backend for tests
//!
//! # Tiger Style
//!
//! - One client value per session; the session is closed exactly once by its owner
//! - Watches are one-shot and must be re-armed explicitly
//! - Fixed-width sequence suffixes so name order equals creation order

mod error;
mod inmemory;
pub mod path;
mod traits;
mod types;

pub use error::CoordinationError;
pub use inmemory::DeterministicCoordinationService;
pub use inmemory::DeterministicSession;
pub use path::SEQUENCE_SUFFIX_WIDTH;
pub use traits::CoordinationClient;
pub use types::ChildrenWatch;
pub use types::CreateMode;
pub use types::WatchEvent;
