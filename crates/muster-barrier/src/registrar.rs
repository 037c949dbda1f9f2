//! Participant registration.
//!
//! Creates the barrier root (with ancestors) and an ephemeral sequential node
//! carrying this participant's payload. The node disappears when the session
//! ends, which is how crashed participants leave the barrier.

use std::sync::Arc;

use muster_core::CoordinationClient;
use muster_core::CreateMode;
use muster_core::path::join_path;
use muster_core::path::leaf_name;
use snafu::ResultExt;
use tracing::debug;
use tracing::info;

use crate::constants::PARTICIPANT_NODE_PREFIX;
use crate::error::BarrierError;
use crate::error::EncodePayloadSnafu;
use crate::error::RegistrationSnafu;
use crate::payload::ParticipantPayload;

/// A registered participant node.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredParticipant {
    /// Barrier root path.
    pub root_path: String,
    /// Full path assigned by the service.
    pub node_path: String,
    /// Last path component, as it appears in children listings.
    pub node_name: String,
    /// The payload written at registration.
    pub payload: ParticipantPayload,
}

/// Registers participants under a barrier root.
pub struct ParticipantRegistrar<C: CoordinationClient + ?Sized> {
    client: Arc<C>,
}

impl<C: CoordinationClient + ?Sized> ParticipantRegistrar<C> {
    /// Create a registrar on the given session.
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Ensure `root_path` exists and create this participant's node under it.
    ///
    /// Any rejection is fatal for the attempt; nothing is retried.
    pub async fn register(
        &self,
        root_path: &str,
        payload: &ParticipantPayload,
    ) -> Result<RegisteredParticipant, BarrierError> {
        self.client.ensure_path(root_path).await.context(RegistrationSnafu { root_path })?;
        debug!(root_path, "barrier root ready");

        let data = payload.encode().context(EncodePayloadSnafu)?;
        let node_path = self
            .client
            .create_node(&join_path(root_path, PARTICIPANT_NODE_PREFIX), data, CreateMode::EphemeralSequential)
            .await
            .context(RegistrationSnafu { root_path })?;
        let node_name = leaf_name(&node_path).to_string();

        info!(
            node = %node_name,
            session_id = self.client.session_id(),
            value = ?payload.participant_value,
            "registered barrier participant"
        );

        Ok(RegisteredParticipant {
            root_path: root_path.to_string(),
            node_path,
            node_name,
            payload: payload.clone(),
        })
    }
}
