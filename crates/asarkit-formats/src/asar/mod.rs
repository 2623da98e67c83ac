//! ASAR archive format
//!
//! An ASAR archive is a JSON header describing a virtual directory tree,
//! followed by the concatenated contents of every packed file.
//!
//! # Format Structure
//!
//! ```text
//! ASAR Archive:
//! ├── Prologue (16 bytes, little-endian)
//! │   ├── pickle_size            (4 bytes, always 4)
//! │   ├── header_size            (4 bytes, header_region_size + 4)
//! │   ├── header_region_size     (4 bytes, align4(text length) + 4)
//! │   └── header_string_length   (4 bytes)
//! ├── Header text (UTF-8 JSON), zero-padded to a 4-byte boundary
//! └── Files region
//!     └── File contents at the offsets recorded in the header
//! ```
//!
//! Each packed file carries an `integrity` record: a digest of the whole
//! content plus one digest per fixed-size block.
//!
//! # Usage Examples
//!
//! ## Patching one entry
//!
//! ```rust
//! use asarkit_formats::asar::{Mutation, patch_archive_file};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mutation = Mutation::new(
//!     [".webpack", "main", "index.js"],
//!     "{withDetails:!0}",
//!     "{withDetails:!0,useQuotes:!1}",
//! );
//! let outcome = patch_archive_file(
//!     Path::new("resources/app.asar"),
//!     Path::new("resources/app.asar.new"),
//!     &mutation,
//! )?;
//! println!(
//!     "header digest {} -> {}",
//!     outcome.old_header_digest, outcome.new_header_digest
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Inspecting a header
//!
//! ```rust
//! use asarkit_formats::asar::ArchiveHeader;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut file = std::fs::File::open("resources/app.asar")?;
//! let header = ArchiveHeader::read(&mut file)?;
//! for (path, entry) in header.tree.files() {
//!     println!("{path}: {} bytes", entry.size);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod header;
mod integrity;
mod mutator;
mod offsets;
mod tree;
mod writer;

// Re-export public API
pub use error::{AsarError, AsarResult};
pub use header::{
    ArchiveHeader, DEFAULT_PICKLE_SIZE, EncodedHeader, PROLOGUE_SIZE, Prologue, align4,
};
pub use integrity::{DEFAULT_BLOCK_SIZE, block_count, compute as compute_integrity};
pub use mutator::{
    Mutation, MutationRecord, PatchOutcome, apply, locate, patch_archive, patch_archive_file,
    rewrite_entry, verify_entry,
};
pub use offsets::{check_ranges, shift_offsets};
pub use tree::{Directory, FileEntry, FileTree, Integrity, Link, Node};
pub use writer::{WriteSummary, write_archive};
