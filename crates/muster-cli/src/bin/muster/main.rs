//! muster - distributed rendezvous barrier participant.
//!
//! Registers this process under a barrier root on etcd, waits until the
//! required number of participants are live, then leaves after a short delay.
//!
//! # Usage
//!
//! ```bash
//! # Three CI jobs wait for each other
//! muster --endpoints http://etcd:2379 --path /ci/run-42 --count 3 --value 17.5
//!
//! # JSON summary for scripting
//! muster --count 3 --json --quiet | jq '.statistics'
//!
//! # Using environment variables
//! export MUSTER_ENDPOINTS="http://etcd:2379"
//! export MUSTER_REQUIRED_COUNT=3
//! muster
//! ```
//!
//! Exit code 0 after passing the barrier or on SIGINT/SIGTERM, 1 on any
//! configuration or coordination failure.
//!
//! # Tiger Style
//!
//! - Explicit error handling with anyhow
//! - Fail-fast on invalid configuration
//! - The coordination session is closed exactly once on every exit path

mod cli;
mod config;
mod output;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use muster_barrier::BarrierParticipant;
use muster_barrier::ExitReason;
use muster_barrier::ExitSequencer;
use muster_barrier::ExitStatus;
use muster_etcd::EtcdCoordinationClient;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::MusterConfig;
use output::OutcomeOutput;
use output::print_output;

/// Initialize tracing subscriber with environment-based filtering.
///
/// - `quiet`: Suppress all logging output (for scripting)
/// - `verbose`: Enable debug-level logging
fn init_tracing(quiet: bool, verbose: bool) {
    let filter = if quiet {
        EnvFilter::new("off")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.is_quiet, cli.is_verbose);

    match run(&cli).await {
        Ok(status) => ExitCode::from(status.code()),
        Err(err) => {
            error!("{err:#}");
            if cli.is_quiet {
                eprintln!("error: {err:#}");
            }
            ExitCode::from(ExitStatus::Failure.code())
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitStatus> {
    let config = MusterConfig::load(cli.config.as_deref(), cli.overrides()).context("invalid configuration")?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let etcd_config = config.etcd_config();
    let client = tokio::select! {
        biased;
        _ = shutdown.cancelled() => return Ok(ExitStatus::Success),
        client = EtcdCoordinationClient::connect(&etcd_config) => {
            Arc::new(client.context("failed to open coordination session")?)
        }
    };

    let participant = BarrierParticipant::new(client.clone(), config.barrier_config());
    let sequencer = ExitSequencer::new(config.exit_delay(), shutdown);

    let reason = sequencer.sequence(participant.enter()).await;
    if let ExitReason::Passed(outcome) = &reason {
        print_output(&OutcomeOutput { outcome }, cli.is_json);
    }
    if cli.is_quiet
        && let ExitReason::Failed(err) = &reason
    {
        eprintln!("error: {err}");
    }
    Ok(sequencer.finish(&*client, &reason).await)
}

/// Wait for shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(err) => {
                error!("failed to install Ctrl+C handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received SIGINT, leaving barrier");
        }
        _ = terminate => {
            info!("received SIGTERM, leaving barrier");
        }
    }
}
