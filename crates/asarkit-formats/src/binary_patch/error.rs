//! Error types for companion binary patching

use thiserror::Error;

/// Companion binary patch errors
#[derive(Error, Debug)]
pub enum BinaryPatchError {
    /// The image does not contain the digest being replaced
    #[error("Digest {digest} not found in executable image")]
    DigestNotFound {
        /// Digest that was searched for
        digest: String,
    },

    /// Old and new digests differ in width, which would shift the image
    #[error("Digest length mismatch: old is {old} bytes, new is {new} bytes")]
    DigestLengthMismatch {
        /// Width of the digest being replaced
        old: usize,
        /// Width of the replacement
        new: usize,
    },

    /// Empty digest string
    #[error("Digest to replace is empty")]
    EmptyDigest,
}

/// Result type for companion binary patching
pub type BinaryPatchResult<T> = Result<T, BinaryPatchError>;

impl BinaryPatchError {
    /// Check if this error means the executable no longer matches the archive
    pub fn is_format_drift(&self) -> bool {
        matches!(self, BinaryPatchError::DigestNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BinaryPatchError::DigestLengthMismatch { old: 64, new: 40 };
        let message = err.to_string();
        assert!(message.contains("64"));
        assert!(message.contains("40"));

        let err = BinaryPatchError::DigestNotFound {
            digest: "abcd".to_string(),
        };
        assert!(err.is_format_drift());
        assert!(!BinaryPatchError::EmptyDigest.is_format_drift());
    }
}
