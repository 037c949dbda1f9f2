//! Barrier defaults and fixed names.

/// Default barrier root path.
pub const DEFAULT_ROOT_PATH: &str = "/barrier";

/// Default number of participants required to pass the barrier.
pub const DEFAULT_REQUIRED_COUNT: u32 = 50;

/// Default delay between barrier passage and session teardown (2 seconds).
pub const DEFAULT_EXIT_DELAY_MS: u64 = 2_000;

/// Name prefix of participant nodes; the service appends the sequence suffix.
pub const PARTICIPANT_NODE_PREFIX: &str = "participant-";
