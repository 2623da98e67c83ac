//! Error types for digest operations

use thiserror::Error;

/// Errors that can occur while computing or parsing digests
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Hex string was not a valid digest of the expected width
    #[error("Invalid digest: {0}")]
    InvalidDigest(#[from] hex::FromHexError),

    /// Digest algorithm name is not supported
    #[error("Unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// I/O error while streaming a file into the hasher
    #[error("I/O error while hashing: {0}")]
    Io(#[from] std::io::Error),
}
