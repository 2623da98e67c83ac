//! Error types for ASAR archive operations
//!
//! Covers header decoding, tree schema checks, entry mutation and archive
//! emission. None of these are retried internally; callers decide whether
//! to restore from a backup.

use asarkit_crypto::CryptoError;
use thiserror::Error;

/// ASAR-specific error types
#[derive(Error, Debug)]
pub enum AsarError {
    /// Prologue lengths are inconsistent with each other or with the stream
    #[error("Malformed header: {reason}")]
    MalformedHeader {
        /// Description of the inconsistency
        reason: String,
    },

    /// Header text is not valid UTF-8 or not parseable JSON
    #[error("Invalid header encoding: {reason}")]
    InvalidEncoding {
        /// Description of the encoding failure
        reason: String,
    },

    /// A node is missing or has the wrong shape
    #[error("Schema error at '{path}': {reason}")]
    SchemaError {
        /// Slash-joined path of the offending node
        path: String,
        /// What was expected there
        reason: String,
    },

    /// Marker substitution did not grow the entry
    #[error("Patch had no effect on '{path}': size {original_size} -> {new_size}")]
    NoOpPatch {
        /// Slash-joined path of the target entry
        path: String,
        /// Entry size before substitution
        original_size: u64,
        /// Entry size after substitution
        new_size: u64,
    },

    /// Entry content does not match its integrity record
    #[error("Integrity mismatch for '{path}'")]
    IntegrityMismatch {
        /// Slash-joined path of the entry
        path: String,
    },

    /// Integrity record names an algorithm this crate cannot compute
    #[error("Unsupported integrity algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Binary format parsing error from binrw
    #[error("Binary format error: {0}")]
    BinaryFormatError(binrw::Error),

    /// I/O error on the source or destination stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for ASAR operations
pub type AsarResult<T> = Result<T, AsarError>;

impl AsarError {
    /// Create a malformed header error
    pub fn malformed_header<S: Into<String>>(reason: S) -> Self {
        Self::MalformedHeader {
            reason: reason.into(),
        }
    }

    /// Create an invalid encoding error
    pub fn invalid_encoding<S: Into<String>>(reason: S) -> Self {
        Self::InvalidEncoding {
            reason: reason.into(),
        }
    }

    /// Create a schema error for a node path
    pub fn schema<P: Into<String>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::SchemaError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error means the archive bytes themselves are damaged
    pub fn is_corruption_error(&self) -> bool {
        matches!(
            self,
            AsarError::MalformedHeader { .. }
                | AsarError::InvalidEncoding { .. }
                | AsarError::IntegrityMismatch { .. }
                | AsarError::BinaryFormatError(_)
        )
    }

    /// Check if this error means the archive no longer has the expected shape
    ///
    /// Typically the producer changed the bundle layout or the entry was
    /// already patched.
    pub fn is_format_drift(&self) -> bool {
        matches!(
            self,
            AsarError::SchemaError { .. } | AsarError::NoOpPatch { .. }
        )
    }
}

impl From<binrw::Error> for AsarError {
    fn from(error: binrw::Error) -> Self {
        match error {
            binrw::Error::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                AsarError::malformed_header("stream ended inside the prologue")
            }
            binrw::Error::Io(io) => AsarError::Io(io),
            other => AsarError::BinaryFormatError(other),
        }
    }
}

impl From<CryptoError> for AsarError {
    fn from(error: CryptoError) -> Self {
        match error {
            CryptoError::UnsupportedAlgorithm(name) => AsarError::UnsupportedAlgorithm(name),
            CryptoError::InvalidDigest(e) => AsarError::invalid_encoding(e.to_string()),
            CryptoError::Io(e) => AsarError::Io(e),
        }
    }
}
