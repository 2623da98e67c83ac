//! Digest algorithms named in archive integrity records

use crate::error::CryptoError;
use crate::sha256::ContentHash;
use std::fmt;
use std::str::FromStr;

/// Digest algorithm declared by an entry's `integrity.algorithm` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// SHA-256, written as `"SHA256"` by archive producers
    Sha256,
}

impl HashAlgorithm {
    /// Name as it appears in the archive header
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
        }
    }

    /// Width of a hex-encoded digest
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Sha256 => 64,
        }
    }

    /// Hex digest of `data`
    pub fn digest_hex(self, data: &[u8]) -> String {
        match self {
            Self::Sha256 => ContentHash::from_data(data).to_hex(),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Producers have written both spellings
        match s.to_ascii_uppercase().as_str() {
            "SHA256" | "SHA-256" => Ok(Self::Sha256),
            _ => Err(CryptoError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_algorithm_names() {
        assert_eq!("SHA256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("sha256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("SHA-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert!(matches!(
            "MD5".parse::<HashAlgorithm>(),
            Err(CryptoError::UnsupportedAlgorithm(name)) if name == "MD5"
        ));
    }

    #[test]
    fn test_digest_hex_width() {
        let algorithm = HashAlgorithm::Sha256;
        assert_eq!(algorithm.digest_hex(b"abc").len(), algorithm.hex_len());
        assert_eq!(algorithm.to_string(), "SHA256");
    }
}
