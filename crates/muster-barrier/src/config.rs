//! Barrier configuration.

use crate::constants::DEFAULT_REQUIRED_COUNT;
use crate::constants::DEFAULT_ROOT_PATH;

/// Configuration for one barrier attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct BarrierConfig {
    /// Path under which participants register.
    pub root_path: String,
    /// Live participants needed to pass.
    pub required_count: u32,
    /// This participant's numeric contribution.
    pub participant_value: Option<f64>,
    /// Origin identifier embedded in the payload.
    pub repository: Option<String>,
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            root_path: DEFAULT_ROOT_PATH.to_string(),
            required_count: DEFAULT_REQUIRED_COUNT,
            participant_value: None,
            repository: None,
        }
    }
}

impl BarrierConfig {
    /// Create a configuration for `required_count` participants under `root_path`.
    pub fn new(root_path: impl Into<String>, required_count: u32) -> Self {
        Self {
            root_path: root_path.into(),
            required_count,
            ..Self::default()
        }
    }

    /// Set this participant's numeric contribution.
    pub fn with_value(mut self, value: f64) -> Self {
        self.participant_value = Some(value);
        self
    }

    /// Set the origin identifier.
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BarrierConfig::default();
        assert_eq!(config.root_path, "/barrier");
        assert_eq!(config.required_count, 50);
        assert_eq!(config.participant_value, None);
    }

    #[test]
    fn builder() {
        let config = BarrierConfig::new("/ci/barrier", 3).with_value(12.5).with_repository("org/repo");
        assert_eq!(config.root_path, "/ci/barrier");
        assert_eq!(config.required_count, 3);
        assert_eq!(config.participant_value, Some(12.5));
        assert_eq!(config.repository.as_deref(), Some("org/repo"));
    }
}
