//! Patcher configuration management.
//!
//! This module handles loading and validating patcher configuration from CLI
//! arguments and environment variables.
//!
//! # Configuration Sources
//!
//! Configuration can be provided via:
//! - CLI arguments (`--archive`, `--executable`, etc.)
//! - Environment variables (`ASARKIT_ARCHIVE`, etc.)
//! - Default values for the launcher entry and its marker pair
//!
//! # Example
//!
//! ```no_run
//! use asarkit_patcher::PatcherConfig;
//!
//! let config = PatcherConfig::from_args();
//! config.validate().expect("Invalid configuration");
//!
//! println!("Patching {} inside {}", config.target, config.archive.display());
//! ```

use crate::error::ConfigError;
use asarkit_formats::asar::Mutation;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Entry patched when no target is given
pub const DEFAULT_TARGET: &str = ".webpack/main/index.js";

/// Marker replaced when no find sequence is given
pub const DEFAULT_FIND: &str = ".startProcess)(V,ie,{withDetails:!0}";

/// Replacement used when no replace sequence is given
pub const DEFAULT_REPLACE: &str = ".startProcess)(V,ie,{withDetails:!0,useQuotes:!1}";

/// Suffix appended to backup copies
pub const DEFAULT_BACKUP_SUFFIX: &str = ".bak";

/// Patcher configuration loaded from CLI args and environment variables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "asarkit-patcher",
    about = "Patch one entry of an ASAR archive and update the launcher's embedded header digest",
    version
)]
pub struct PatcherConfig {
    /// Path to the archive (usually resources/app.asar)
    #[arg(long, env = "ASARKIT_ARCHIVE")]
    pub archive: PathBuf,

    /// Path to the launcher executable embedding the header digest
    #[arg(long, env = "ASARKIT_EXECUTABLE")]
    pub executable: PathBuf,

    /// Slash-separated path of the entry to patch inside the archive
    #[arg(long, env = "ASARKIT_TARGET", default_value = DEFAULT_TARGET)]
    pub target: String,

    /// Literal text to search for in the entry
    #[arg(
        long,
        env = "ASARKIT_FIND",
        default_value = DEFAULT_FIND,
        allow_hyphen_values = true
    )]
    pub find: String,

    /// Literal text substituted for every occurrence of `find`
    #[arg(
        long,
        env = "ASARKIT_REPLACE",
        default_value = DEFAULT_REPLACE,
        allow_hyphen_values = true
    )]
    pub replace: String,

    /// Suffix appended to the original file names for backups
    #[arg(long, env = "ASARKIT_BACKUP_SUFFIX", default_value = DEFAULT_BACKUP_SUFFIX)]
    pub backup_suffix: String,
}

impl PatcherConfig {
    /// Parse configuration from command-line arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Configuration for the given files with default target and markers.
    #[must_use]
    pub fn for_files(archive: impl Into<PathBuf>, executable: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            executable: executable.into(),
            target: DEFAULT_TARGET.to_string(),
            find: DEFAULT_FIND.to_string(),
            replace: DEFAULT_REPLACE.to_string(),
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }

    /// The entry mutation described by this configuration.
    #[must_use]
    pub fn mutation(&self) -> Mutation {
        Mutation::new(
            Mutation::split_path(&self.target),
            self.find.as_str(),
            self.replace.as_str(),
        )
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The archive or executable doesn't exist
    /// - The target path has no components
    /// - The find marker is empty or identical to the replacement
    /// - The backup suffix is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_file(&self.archive)?;
        require_file(&self.executable)?;

        if Mutation::split_path(&self.target).is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "target",
                reason: "entry path must name at least one component".to_string(),
            });
        }

        if self.find.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "find",
                reason: "marker must not be empty".to_string(),
            });
        }

        if self.find == self.replace {
            return Err(ConfigError::InvalidValue {
                field: "replace",
                reason: "replacement is identical to the marker".to_string(),
            });
        }

        // An empty suffix would make the backup overwrite the original
        if self.backup_suffix.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "backup_suffix",
                reason: "suffix must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

fn require_file(path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        })
    }
}
