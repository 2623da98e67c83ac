//! ASAR archive mutation and companion binary patching
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::doc_markdown)] // Format field names don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::similar_names)] // Domain-specific naming patterns
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! This crate edits a single entry inside an ASAR archive (the packed
//! application bundle used by Electron) while keeping the archive
//! self-consistent, and then carries the resulting header digest change
//! into the executable that embeds it.
//!
//! # Modules
//!
//! - **asar**: header codec, file tree, offset propagation, integrity
//!   recomputation, entry mutation and archive writing
//! - **binary_patch**: fixed-width digest substitution in executable images
//!
//! # Design Principles
//!
//! - **Symmetric Operations**: every header that can be parsed can be built
//! - **Round-Trip Guarantee**: build(parse(data)) == data for unmodified headers
//! - **Type Safety**: tree nodes are a tagged enum, not loose JSON
//! - **No Partial Commits**: all header edits happen in memory before writing

#![warn(missing_docs)]

pub mod asar;
pub mod binary_patch;

// Test utilities module
#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
pub(crate) mod test_utils;

/// Common format trait for binary structures with parse/build symmetry
pub trait ArchiveFormat: Sized {
    /// Parse from bytes
    fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>>;

    /// Build to bytes
    fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>>;

    /// Verify round-trip correctness
    fn verify_round_trip(data: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
        let parsed = Self::parse(data)?;
        let rebuilt = parsed.build()?;
        if data != rebuilt.as_slice() {
            return Err("Round-trip verification failed".into());
        }
        Ok(())
    }
}
