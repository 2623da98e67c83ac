//! Block and whole-content digests for file entries

use crate::asar::error::{AsarError, AsarResult};
use crate::asar::tree::Integrity;
use asarkit_crypto::HashAlgorithm;

/// Block size written by current archive producers (4 MiB)
pub const DEFAULT_BLOCK_SIZE: u32 = 4 * 1024 * 1024;

/// Number of blocks covering `len` bytes
pub const fn block_count(len: u64, block_size: u32) -> u64 {
    len.div_ceil(block_size as u64)
}

/// Digest each `block_size` chunk of `content` and the content as a whole
///
/// The final block is shorter when `content.len()` is not a multiple of
/// `block_size`. Empty content has no blocks.
pub fn compute(content: &[u8], algorithm: &str, block_size: u32) -> AsarResult<Integrity> {
    let hasher: HashAlgorithm = algorithm.parse()?;
    if block_size == 0 {
        return Err(AsarError::schema("#integrity", "blockSize must be non-zero"));
    }

    let blocks = content
        .chunks(block_size as usize)
        .map(|chunk| hasher.digest_hex(chunk))
        .collect();
    Ok(Integrity::new(
        algorithm,
        hasher.digest_hex(content),
        block_size,
        blocks,
    ))
}

impl Integrity {
    /// New record for `content` using this record's algorithm and block size
    pub fn recompute(&self, content: &[u8]) -> AsarResult<Self> {
        let fresh = compute(content, &self.algorithm, self.block_size)?;
        Ok(self.with_digests(fresh.hash, fresh.blocks))
    }

    /// Whether this record describes `content`
    pub fn verify(&self, content: &[u8]) -> AsarResult<bool> {
        let fresh = compute(content, &self.algorithm, self.block_size)?;
        Ok(fresh.hash.eq_ignore_ascii_case(&self.hash)
            && fresh.blocks.len() == self.blocks.len()
            && fresh
                .blocks
                .iter()
                .zip(&self.blocks)
                .all(|(a, b)| a.eq_ignore_ascii_case(b)))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use asarkit_crypto::ContentHash;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_short_final_block() {
        let content = b"0123456789";
        let integrity = compute(content, "SHA256", 4).unwrap();

        assert_eq!(integrity.blocks.len(), 3);
        assert_eq!(integrity.blocks[0], ContentHash::from_data(b"0123").to_hex());
        assert_eq!(integrity.blocks[1], ContentHash::from_data(b"4567").to_hex());
        assert_eq!(integrity.blocks[2], ContentHash::from_data(b"89").to_hex());
        assert_eq!(integrity.hash, ContentHash::from_data(content).to_hex());
    }

    #[test]
    fn test_exact_multiple_has_no_extra_block() {
        let integrity = compute(b"01234567", "SHA256", 4).unwrap();
        assert_eq!(integrity.blocks.len(), 2);
    }

    #[test]
    fn test_empty_content() {
        let integrity = compute(b"", "SHA256", DEFAULT_BLOCK_SIZE).unwrap();
        assert!(integrity.blocks.is_empty());
        assert_eq!(integrity.hash, ContentHash::from_data(b"").to_hex());
    }

    #[test]
    fn test_rejects_unknown_algorithm_and_zero_block_size() {
        assert!(matches!(
            compute(b"x", "CRC32", 4),
            Err(AsarError::UnsupportedAlgorithm(name)) if name == "CRC32"
        ));
        assert!(matches!(
            compute(b"x", "SHA256", 0),
            Err(AsarError::SchemaError { .. })
        ));
    }

    #[test]
    fn test_recompute_keeps_algorithm_spelling() {
        let old = Integrity::new("sha256", "00", 4, vec!["00".to_string()]);
        let new = old.recompute(b"abcdef").unwrap();
        assert_eq!(new.algorithm, "sha256");
        assert_eq!(new.block_size, 4);
        assert_eq!(new.blocks.len(), 2);
        assert!(new.verify(b"abcdef").unwrap());
        assert!(!new.verify(b"abcdeg").unwrap());
        assert!(!old.verify(b"abcdef").unwrap());
    }

    proptest! {
        #[test]
        fn prop_block_count_matches_chunks(len in 0usize..5000, block_size in 1u32..700) {
            let content = vec![0xA5u8; len];
            let integrity = compute(&content, "SHA256", block_size).unwrap();
            prop_assert_eq!(integrity.blocks.len() as u64, block_count(len as u64, block_size));
        }
    }
}
