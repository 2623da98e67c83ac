//! ASAR prologue and header codec
//!
//! The archive starts with two nested length-prefixed pickles:
//!
//! ```text
//! 0..4    pickle_size           always 4: payload size of the outer pickle
//! 4..8    header_size           header_region_size + 4
//! 8..12   header_region_size    align4(header_string_length) + 4
//! 12..16  header_string_length  exact UTF-8 length of the header text
//! 16..    header text, zero-padded to a 4-byte boundary
//! ```
//!
//! File contents begin at `header_region_size + 12`. All integers are
//! little-endian.

use crate::asar::error::{AsarError, AsarResult};
use crate::asar::tree::FileTree;
use asarkit_crypto::ContentHash;
use binrw::{BinRead, BinWrite};
use std::io::{Cursor, Read, Seek, SeekFrom};

/// Size of the fixed prologue in bytes
pub const PROLOGUE_SIZE: usize = 16;

/// Value every known producer writes into `pickle_size`
pub const DEFAULT_PICKLE_SIZE: u32 = 4;

/// Round up to the next multiple of four
pub const fn align4(len: u32) -> u32 {
    len.div_ceil(4) * 4
}

/// The four little-endian integers at the start of an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct Prologue {
    /// Payload size of the outer pickle, carried through unchanged
    pub pickle_size: u32,
    /// Size of the header pickle including its own length field
    pub header_size: u32,
    /// Size of the header pickle payload: aligned text plus its length prefix
    pub header_region_size: u32,
    /// Unaligned length of the header text
    pub header_string_length: u32,
}

impl Prologue {
    /// Derive a prologue for header text of the given length
    pub fn for_text_length(pickle_size: u32, text_len: usize) -> AsarResult<Self> {
        let header_string_length = u32::try_from(text_len)
            .ok()
            .filter(|len| *len <= u32::MAX - 12)
            .ok_or_else(|| {
                AsarError::malformed_header(format!("header text too long: {text_len} bytes"))
            })?;
        let header_region_size = align4(header_string_length) + 4;

        Ok(Self {
            pickle_size,
            header_size: header_region_size + 4,
            header_region_size,
            header_string_length,
        })
    }

    /// Check that the declared sizes agree with each other
    pub fn validate(&self) -> AsarResult<()> {
        if self.header_string_length > u32::MAX - 12 {
            return Err(AsarError::malformed_header(format!(
                "header_string_length {} is out of range",
                self.header_string_length
            )));
        }

        let expected = align4(self.header_string_length) + 4;
        if self.header_region_size != expected {
            return Err(AsarError::malformed_header(format!(
                "header_region_size {} does not match string length {} (expected {expected})",
                self.header_region_size, self.header_string_length
            )));
        }

        Ok(())
    }

    /// Absolute offset at which file contents begin
    pub const fn files_offset(&self) -> u64 {
        self.header_region_size as u64 + 12
    }

    /// Zero bytes written after the header text
    pub const fn padding_len(&self) -> usize {
        (align4(self.header_string_length) - self.header_string_length) as usize
    }
}

/// Header text and prologue exactly as they will be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedHeader {
    /// Prologue derived from `text`
    pub prologue: Prologue,
    /// Compact header text
    pub text: String,
}

impl EncodedHeader {
    /// Digest of the header text, the value companion executables embed
    pub fn digest(&self) -> ContentHash {
        ContentHash::from_data(self.text.as_bytes())
    }

    /// Absolute offset at which file contents begin
    pub const fn files_offset(&self) -> u64 {
        self.prologue.files_offset()
    }

    /// Prologue, text and padding
    pub fn to_bytes(&self) -> AsarResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::with_capacity(
            PROLOGUE_SIZE + self.text.len() + self.prologue.padding_len(),
        ));
        self.prologue.write(&mut cursor)?;

        let mut bytes = cursor.into_inner();
        bytes.extend_from_slice(self.text.as_bytes());
        bytes.resize(bytes.len() + self.prologue.padding_len(), 0);
        Ok(bytes)
    }
}

/// Decoded archive header
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveHeader {
    /// Prologue as read from the archive
    pub prologue: Prologue,
    /// File tree; mutations are made here and picked up by [`ArchiveHeader::encode`]
    pub tree: FileTree,
    source_text: String,
}

impl ArchiveHeader {
    /// Decode the header at the start of an in-memory archive
    pub fn parse(data: &[u8]) -> AsarResult<Self> {
        Self::read(&mut Cursor::new(data))
    }

    /// Decode the header at the start of a seekable stream
    ///
    /// Only the prologue and header text are read. On return the stream is
    /// positioned just after the header text.
    pub fn read<R: Read + Seek>(reader: &mut R) -> AsarResult<Self> {
        let stream_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        if stream_len < PROLOGUE_SIZE as u64 {
            return Err(AsarError::malformed_header(format!(
                "stream is {stream_len} bytes, shorter than the {PROLOGUE_SIZE}-byte prologue"
            )));
        }

        let prologue = Prologue::read(reader)?;
        prologue.validate()?;

        if stream_len < prologue.files_offset() {
            return Err(AsarError::malformed_header(format!(
                "stream is {stream_len} bytes but the header declares files start at {}",
                prologue.files_offset()
            )));
        }

        let mut raw = vec![0u8; prologue.header_string_length as usize];
        reader.read_exact(&mut raw)?;
        let source_text = String::from_utf8(raw)
            .map_err(|e| AsarError::invalid_encoding(format!("header is not UTF-8: {e}")))?;
        let tree = FileTree::from_json(&source_text)?;

        Ok(Self {
            prologue,
            tree,
            source_text,
        })
    }

    /// Wrap a tree with a freshly derived prologue
    pub fn from_tree(tree: FileTree) -> AsarResult<Self> {
        let source_text = tree.to_json()?;
        let prologue = Prologue::for_text_length(DEFAULT_PICKLE_SIZE, source_text.len())?;
        Ok(Self {
            prologue,
            tree,
            source_text,
        })
    }

    /// Header text as it was decoded; unaffected by later tree edits
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Digest of the header text as it was decoded
    pub fn source_digest(&self) -> ContentHash {
        ContentHash::from_data(self.source_text.as_bytes())
    }

    /// Absolute offset of the files region in the source archive
    pub const fn files_offset(&self) -> u64 {
        self.prologue.files_offset()
    }

    /// Serialize the current tree and derive a matching prologue
    ///
    /// `pickle_size` is carried over from the source; every other field is
    /// recomputed from the new text length.
    pub fn encode(&self) -> AsarResult<EncodedHeader> {
        let text = self.tree.to_json()?;
        let prologue = Prologue::for_text_length(self.prologue.pickle_size, text.len())?;
        Ok(EncodedHeader { prologue, text })
    }
}

impl crate::ArchiveFormat for ArchiveHeader {
    fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(ArchiveHeader::parse(data)?)
    }

    fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        Ok(self.encode()?.to_bytes()?)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ArchiveFormat;
    use pretty_assertions::assert_eq;

    fn archive_bytes(text: &str, files: &[u8]) -> Vec<u8> {
        let prologue = Prologue::for_text_length(4, text.len()).unwrap();
        let mut bytes = EncodedHeader {
            prologue,
            text: text.to_string(),
        }
        .to_bytes()
        .unwrap();
        bytes.extend_from_slice(files);
        bytes
    }

    #[test]
    fn test_align4() {
        assert_eq!(align4(0), 0);
        assert_eq!(align4(1), 4);
        assert_eq!(align4(4), 4);
        assert_eq!(align4(5), 8);
        assert_eq!(align4(7), 8);
    }

    #[test]
    fn test_prologue_for_text_length() {
        let prologue = Prologue::for_text_length(4, 13).unwrap();
        assert_eq!(prologue.header_string_length, 13);
        assert_eq!(prologue.header_region_size, 20);
        assert_eq!(prologue.header_size, 24);
        assert_eq!(prologue.files_offset(), 32);
        assert_eq!(prologue.padding_len(), 3);
        assert!(prologue.validate().is_ok());
    }

    #[test]
    fn test_prologue_layout_on_disk() {
        let text = r#"{"files":{}}"#;
        let bytes = archive_bytes(text, &[]);

        assert_eq!(&bytes[0..4], &4u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &20u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &16u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &12u32.to_le_bytes());
        assert_eq!(&bytes[16..28], text.as_bytes());
        assert_eq!(bytes.len(), 28);
    }

    #[test]
    fn test_padding_is_zero_filled() {
        let text = r#"{"files":{"a":{"size":0,"offset":"0"}}}"#;
        let bytes = archive_bytes(text, b"");
        let prologue = Prologue::for_text_length(4, text.len()).unwrap();
        let pad_start = PROLOGUE_SIZE + text.len();

        assert_eq!(bytes.len() as u64, prologue.files_offset());
        assert!(bytes[pad_start..].iter().all(|b| *b == 0));
        assert_eq!(bytes.len() - pad_start, prologue.padding_len());
    }

    #[test]
    fn test_decode_encode_round_trip() {
        let text = r#"{"files":{"a":{"offset":"0","size":4},"b":{"offset":"4","size":3}}}"#;
        let bytes = archive_bytes(text, b"XXXXYYY");

        let header = ArchiveHeader::parse(&bytes).expect("valid archive");
        assert_eq!(header.source_text(), text);
        assert_eq!(header.files_offset(), 16 + u64::from(align4(text.len() as u32)));

        let encoded = header.encode().unwrap();
        assert_eq!(encoded.prologue, header.prologue);
        assert_eq!(encoded.text, text);

        let rebuilt = encoded.to_bytes().unwrap();
        assert_eq!(rebuilt.as_slice(), &bytes[..header.files_offset() as usize]);

        let reparsed = ArchiveHeader::parse(&rebuilt).unwrap();
        assert_eq!(reparsed.tree, header.tree);
    }

    #[test]
    fn test_pickle_size_is_preserved() {
        let text = r#"{"files":{}}"#;
        let mut bytes = archive_bytes(text, &[]);
        bytes[0..4].copy_from_slice(&8u32.to_le_bytes());

        let header = ArchiveHeader::parse(&bytes).unwrap();
        assert_eq!(header.prologue.pickle_size, 8);
        assert_eq!(header.encode().unwrap().prologue.pickle_size, 8);
    }

    #[test]
    fn test_truncated_stream_is_malformed() {
        let bytes = archive_bytes(r#"{"files":{}}"#, &[]);

        for len in [0, 7, 15, 20] {
            let err = ArchiveHeader::parse(&bytes[..len]).unwrap_err();
            assert!(
                matches!(err, AsarError::MalformedHeader { .. }),
                "len {len}: {err:?}"
            );
        }
    }

    #[test]
    fn test_inconsistent_region_size_is_malformed() {
        let mut bytes = archive_bytes(r#"{"files":{}}"#, &[]);
        bytes[8..12].copy_from_slice(&40u32.to_le_bytes());
        let err = ArchiveHeader::parse(&bytes).unwrap_err();
        assert!(matches!(err, AsarError::MalformedHeader { .. }));
    }

    #[test]
    fn test_non_utf8_header_is_encoding_error() {
        let mut bytes = archive_bytes(r#"{"files":{}}"#, &[]);
        bytes[17] = 0xff;
        let err = ArchiveHeader::parse(&bytes).unwrap_err();
        assert!(matches!(err, AsarError::InvalidEncoding { .. }));
    }

    #[test]
    fn test_digests_differ_after_edit() {
        let text = r#"{"files":{"a":{"size":1,"offset":"0"}}}"#;
        let mut header = ArchiveHeader::parse(&archive_bytes(text, b"a")).unwrap();
        let before = header.source_digest();
        assert_eq!(before, header.encode().unwrap().digest());

        header
            .tree
            .root_mut()
            .insert("b", crate::asar::Node::File(crate::asar::FileEntry::new(1, 1)));
        assert_eq!(header.source_digest(), before);
        assert_ne!(header.encode().unwrap().digest(), before);
    }

    #[test]
    fn test_archive_format_round_trip() {
        let header = ArchiveHeader::from_tree(
            FileTree::from_json(r#"{"files":{"x":{"size":2,"offset":"0"}}}"#).unwrap(),
        )
        .unwrap();
        crate::assert_round_trip!(header);

        let bytes = archive_bytes(r#"{"files":{"dir":{"files":{}}}}"#, b"");
        ArchiveHeader::verify_round_trip(&bytes).expect("byte-identical rebuild");
    }
}
