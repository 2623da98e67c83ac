//! ASAR launcher patcher.
//!
//! This crate wraps the archive mutation engine from `asarkit-formats` in the
//! bookkeeping a real patch run needs:
//! - backups of the archive and its launcher executable
//! - staged writes that only replace the originals once both are ready
//! - rollback from backups if replacing fails
//! - a sidecar digest so a second run recognises an already patched archive
//!
//! # Architecture
//!
//! - `config`: Configuration loading and validation
//! - `error`: Error types
//! - `fs`: File operations the orchestrator consumes
//! - `orchestrator`: Backup, stage, commit and rollback
//!
//! # Example
//!
//! ```no_run
//! use asarkit_patcher::{LocalFs, Orchestrator, PatcherConfig, RunOutcome};
//!
//! fn main() -> anyhow::Result<()> {
//!     tracing_subscriber::fmt::init();
//!
//!     let config = PatcherConfig::from_args();
//!     config.validate()?;
//!
//!     match Orchestrator::from_config(LocalFs, &config).run()? {
//!         RunOutcome::Patched(report) => println!("new digest {}", report.new_header_digest),
//!         RunOutcome::AlreadyPatched { .. } => println!("already patched"),
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

// Module declarations
pub mod config;
pub mod error;
pub mod fs;
pub mod orchestrator;

// Re-exports for public API
pub use config::PatcherConfig;
pub use error::{ConfigError, PatchError, PatchResult};
pub use fs::{FileOps, LocalFs};
pub use orchestrator::{Orchestrator, PatchPaths, PatchReport, RunOutcome};
