//! Content digests for ASAR archives
//!
//! This crate provides the hashing primitives used when an archive entry is
//! rewritten: per-block and whole-content SHA-256 digests for the header's
//! `integrity` records, and streaming whole-file digests for the
//! "already patched" sidecar check.
//!
//! # Examples
//!
//! ## Digest of a buffer
//!
//! ```
//! use asarkit_crypto::ContentHash;
//!
//! let hash = ContentHash::from_data(b"Hello, World!");
//! assert_eq!(hash.to_hex().len(), 64);
//! ```
//!
//! ## Algorithm lookup by header name
//!
//! ```
//! use asarkit_crypto::HashAlgorithm;
//!
//! let algorithm: HashAlgorithm = "SHA256".parse().expect("known algorithm");
//! assert_eq!(algorithm.hex_len(), 64);
//! ```

#![warn(missing_docs)]

pub mod algorithm;
pub mod error;
pub mod sha256;

pub use error::CryptoError;

pub use algorithm::HashAlgorithm;
pub use sha256::{ContentHash, FILE_CHUNK_SIZE, digest_file, digest_reader};
