//! Participant payload wire format.
//!
//! UTF-8 JSON written once at registration:
//!
//! ```json
//! {"repository": "org/repo", "participantValue": 42}
//! ```
//!
//! `repository` is omitted when unknown; `participantValue` is `null` for
//! presence-only participants.

use serde::Deserialize;
use serde::Serialize;

/// Metadata a participant publishes in its node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantPayload {
    /// Origin identifier, e.g. the source repository of the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Numeric contribution, absent for presence-only participants.
    #[serde(default)]
    pub participant_value: Option<f64>,
}

impl ParticipantPayload {
    /// Create a payload.
    pub fn new(repository: Option<String>, participant_value: Option<f64>) -> Self {
        Self {
            repository,
            participant_value,
        }
    }

    /// Serialize to the wire format.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Parse the wire format.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
