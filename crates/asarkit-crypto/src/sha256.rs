//! SHA-256 hashing for archive content and whole files

use crate::error::CryptoError;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Chunk size used when streaming files into the hasher
pub const FILE_CHUNK_SIZE: usize = 64 * 1024;

/// SHA-256 digest of a byte sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a hash from raw digest bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash a complete buffer
    pub fn from_data(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self::from_hasher(hasher)
    }

    fn from_hasher(hasher: Sha256) -> Self {
        let result = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }

    /// Parse a hash from its lowercase or uppercase hex form
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Get raw bytes
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Hash everything a reader yields, [`FILE_CHUNK_SIZE`] bytes at a time
pub fn digest_reader<R: Read>(mut reader: R) -> Result<ContentHash, CryptoError> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; FILE_CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(ContentHash::from_hasher(hasher))
}

/// Hash a file on disk without loading it into memory
pub fn digest_file(path: impl AsRef<Path>) -> Result<ContentHash, CryptoError> {
    let file = File::open(path.as_ref())?;
    digest_reader(file)
}
