//! In-place digest substitution over an owned image buffer

use crate::binary_patch::error::{BinaryPatchError, BinaryPatchResult};
use tracing::debug;

/// Start offsets of non-overlapping occurrences of `needle`, left to right
pub fn find_occurrences(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    let mut found = Vec::new();
    if needle.is_empty() || needle.len() > haystack.len() {
        return found;
    }

    let first = needle[0];
    let mut pos = 0;
    while pos + needle.len() <= haystack.len() {
        if haystack[pos] == first && &haystack[pos..pos + needle.len()] == needle {
            found.push(pos);
            pos += needle.len();
        } else {
            pos += 1;
        }
    }
    found
}

/// Replace every occurrence of `old_digest` with `new_digest` in `image`
///
/// Both digests must have the same width so no byte after a replacement
/// moves. Returns the number of occurrences replaced.
pub fn patch_digest(
    image: &mut [u8],
    old_digest: &str,
    new_digest: &str,
) -> BinaryPatchResult<usize> {
    let old = old_digest.as_bytes();
    let new = new_digest.as_bytes();
    if old.is_empty() {
        return Err(BinaryPatchError::EmptyDigest);
    }
    if old.len() != new.len() {
        return Err(BinaryPatchError::DigestLengthMismatch {
            old: old.len(),
            new: new.len(),
        });
    }

    let positions = find_occurrences(image, old);
    if positions.is_empty() {
        return Err(BinaryPatchError::DigestNotFound {
            digest: old_digest.to_string(),
        });
    }

    for &pos in &positions {
        image[pos..pos + new.len()].copy_from_slice(new);
    }
    debug!(occurrences = positions.len(), ?positions, "replaced embedded digest");
    Ok(positions.len())
}
