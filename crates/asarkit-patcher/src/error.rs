//! Error types for the patcher.
//!
//! All errors use thiserror for consistent error handling across the codebase.

use asarkit_crypto::CryptoError;
use asarkit_formats::asar::AsarError;
use asarkit_formats::binary_patch::BinaryPatchError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Input file does not exist or is not a regular file
    #[error("File not found: {}", path.display())]
    FileNotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// A configuration value was rejected
    #[error("Invalid {field}: {reason}")]
    InvalidValue {
        /// Name of the offending option
        field: &'static str,
        /// Reason for rejection
        reason: String,
    },
}

/// Errors raised while patching an archive and its executable.
#[derive(Debug, Error)]
pub enum PatchError {
    /// Archive could not be decoded or mutated
    #[error("Archive error: {0}")]
    Archive(#[from] AsarError),

    /// Executable digest could not be replaced
    #[error("Executable patch error: {0}")]
    Executable(#[from] BinaryPatchError),

    /// Digest computation or sidecar parsing failed
    #[error("Digest error: {0}")]
    Digest(#[from] CryptoError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// File system operation failed
    #[error("Failed to {action} {}: {source}", path.display())]
    FileOp {
        /// Operation that failed
        action: &'static str,
        /// Path the operation was applied to
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The patch failed after the originals were replaced and restoring
    /// them from backups failed too
    #[error("{cause}; restoring backups also failed: {restore}")]
    RollbackFailed {
        /// Error that triggered the rollback
        cause: Box<PatchError>,
        /// Error raised while restoring
        restore: Box<PatchError>,
    },
}

/// Result type for patch operations
pub type PatchResult<T> = Result<T, PatchError>;

impl PatchError {
    /// Wrap an I/O error with the operation and path it came from
    pub fn file_op(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::FileOp {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Check if the inputs no longer have the shape the patch expects
    ///
    /// This covers an entry that was already modified and an executable
    /// that no longer embeds the archive's header digest.
    pub fn is_format_drift(&self) -> bool {
        match self {
            Self::Archive(err) => err.is_format_drift(),
            Self::Executable(err) => err.is_format_drift(),
            Self::RollbackFailed { cause, .. } => cause.is_format_drift(),
            _ => false,
        }
    }

    /// Check if the originals may be left in a modified state
    pub fn needs_manual_recovery(&self) -> bool {
        matches!(self, Self::RollbackFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::FileNotFound {
            path: PathBuf::from("resources/app.asar"),
        };
        assert_eq!(err.to_string(), "File not found: resources/app.asar");

        let err = ConfigError::InvalidValue {
            field: "find",
            reason: "must not be empty".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid find: must not be empty");
    }

    #[test]
    fn test_format_drift_classification() {
        let err: PatchError = AsarError::NoOpPatch {
            path: "main.js".to_string(),
            original_size: 10,
            new_size: 10,
        }
        .into();
        assert!(err.is_format_drift());
        assert!(!err.needs_manual_recovery());

        let err: PatchError = BinaryPatchError::DigestNotFound {
            digest: "ab".to_string(),
        }
        .into();
        assert!(err.is_format_drift());

        let io = PatchError::file_op(
            "rename",
            Path::new("app.asar.new"),
            std::io::Error::other("busy"),
        );
        assert!(!io.is_format_drift());
        assert!(io.to_string().contains("app.asar.new"));

        let rollback = PatchError::RollbackFailed {
            cause: Box::new(err),
            restore: Box::new(io),
        };
        assert!(rollback.is_format_drift());
        assert!(rollback.needs_manual_recovery());
    }
}
