//! asarkit patcher binary entry point.
//!
//! This is a thin wrapper around the asarkit-patcher library that:
//! 1. Initializes logging
//! 2. Parses and validates configuration
//! 3. Runs the orchestrator
//!
//! For library usage, see the asarkit-patcher crate documentation.

use anyhow::Result;
use asarkit_patcher::{LocalFs, Orchestrator, PatcherConfig, RunOutcome};

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Parse configuration from CLI args
    let config = PatcherConfig::from_args();

    tracing::info!(
        "Configuration loaded: archive={:?}, executable={:?}, target={}",
        config.archive,
        config.executable,
        config.target
    );

    // Validate configuration
    config.validate()?;

    let orchestrator = Orchestrator::from_config(LocalFs, &config);
    match orchestrator.run()? {
        RunOutcome::Patched(report) => {
            tracing::info!(
                "Patched {} ({:+} bytes), header digest {} -> {}",
                report.record.path(),
                report.record.size_delta(),
                report.old_header_digest,
                report.new_header_digest
            );
        }
        RunOutcome::AlreadyPatched { archive_digest } => {
            tracing::info!("Archive already patched (digest {archive_digest})");
        }
    }

    Ok(())
}
