//! Command-line arguments.
//!
//! Every setting flag is optional; unset flags fall through to the TOML file
//! and then the environment (see [`crate::config`]).

use std::path::PathBuf;

use clap::Parser;

use crate::config::MusterConfig;

/// Wait at a distributed rendezvous barrier until enough participants arrive.
#[derive(Parser, Debug)]
#[command(name = "muster")]
#[command(version)]
#[command(about = "Wait at a distributed rendezvous barrier until enough participants arrive")]
#[command(long_about = "Registers this process under a barrier root on etcd and blocks until the \
    required number of participants are live. The earliest registered participant logs \
    max/min/mean statistics over the values the participants contributed.")]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Comma-separated etcd endpoints [default: http://127.0.0.1:2379].
    #[arg(long, value_delimiter = ',', value_name = "URL")]
    pub endpoints: Option<Vec<String>>,

    /// Barrier root path [default: /barrier].
    #[arg(long = "path", value_name = "PATH")]
    pub root_path: Option<String>,

    /// Participants required to pass [default: 50].
    #[arg(long = "count", value_name = "N")]
    pub required_count: Option<u32>,

    /// This participant's numeric contribution to the statistics.
    #[arg(long = "value", value_name = "X", allow_negative_numbers = true)]
    pub participant_value: Option<f64>,

    /// Delay in milliseconds between passing and leaving [default: 2000].
    #[arg(long = "exit-delay", value_name = "MS")]
    pub exit_delay_ms: Option<u64>,

    /// Session TTL in seconds [default: 10].
    #[arg(long = "session-ttl", value_name = "SECS")]
    pub session_ttl_secs: Option<u64>,

    /// Origin identifier written into the participant payload.
    #[arg(long)]
    pub repository: Option<String>,

    /// Output JSON instead of human-readable format.
    #[arg(long = "json")]
    pub is_json: bool,

    /// Enable verbose logging.
    #[arg(short = 'v', long = "verbose", conflicts_with = "is_quiet")]
    pub is_verbose: bool,

    /// Suppress all logging output.
    #[arg(short = 'q', long = "quiet")]
    pub is_quiet: bool,
}

impl Cli {
    /// The configuration layer given on the command line.
    pub fn overrides(&self) -> MusterConfig {
        MusterConfig {
            endpoints: self.endpoints.clone(),
            session_ttl_secs: self.session_ttl_secs,
            root_path: self.root_path.clone(),
            required_count: self.required_count,
            participant_value: self.participant_value,
            exit_delay_ms: self.exit_delay_ms,
            repository: self.repository.clone(),
        }
    }
}
