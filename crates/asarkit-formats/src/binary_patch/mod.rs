//! Companion executable digest patching
//!
//! Electron-style launchers embed the hex digest of their archive's header
//! text so they can refuse a tampered archive. After the header changes,
//! every embedded copy of the old digest must be replaced with the new one.
//!
//! The executable is treated as an opaque byte buffer. Replacement is
//! length-preserving: both digests come from the same algorithm, so every
//! section, relocation and checksum offset stays where it was.
//!
//! # Usage
//!
//! ```rust
//! use asarkit_formats::binary_patch;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut image = std::fs::read("launcher.exe.new")?;
//! let replaced = binary_patch::patch_digest(&mut image, "aaaa", "bbbb")?;
//! std::fs::write("launcher.exe.new", &image)?;
//! println!("replaced {replaced} occurrences");
//! # Ok(())
//! # }
//! ```

mod error;
mod patcher;

pub use error::{BinaryPatchError, BinaryPatchResult};
pub use patcher::{find_occurrences, patch_digest};
