//! Streams a mutated archive
//!
//! Only the header and the rewritten entry are materialised in memory;
//! everything else is copied from the source stream.

use crate::asar::error::{AsarError, AsarResult};
use crate::asar::mutator::MutationRecord;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Byte counts of an emitted archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    /// Prologue, header text and padding
    pub header_bytes: u64,
    /// Everything after the header
    pub files_bytes: u64,
}

impl WriteSummary {
    /// Total bytes written
    pub const fn total(&self) -> u64 {
        self.header_bytes + self.files_bytes
    }
}

/// Write the new archive to `sink`
///
/// 1. `header` (prologue, text and padding, already encoded)
/// 2. source bytes from `source_files_offset` up to the original entry
/// 3. `new_content`
/// 4. source bytes after the original entry, to the end
///
/// Entries after the rewritten one keep their bytes; only their recorded
/// offsets changed, and the sequential copy lands them exactly there.
pub fn write_archive<R, W>(
    source: &mut R,
    source_files_offset: u64,
    record: &MutationRecord,
    new_content: &[u8],
    header: &[u8],
    sink: &mut W,
) -> AsarResult<WriteSummary>
where
    R: Read + Seek,
    W: Write,
{
    let source_len = source.seek(SeekFrom::End(0))?;
    let Some((entry_start, entry_end)) = source_files_offset
        .checked_add(record.original_offset)
        .and_then(|start| Some((start, start.checked_add(record.original_size)?)))
    else {
        return Err(AsarError::malformed_header(format!(
            "entry '{}' at offset {} with size {} lies beyond any addressable position",
            record.path(),
            record.original_offset,
            record.original_size
        )));
    };
    if entry_end > source_len {
        return Err(AsarError::malformed_header(format!(
            "entry '{}' spans {entry_start}..{entry_end} but the archive is {source_len} bytes",
            record.path()
        )));
    }

    sink.write_all(header)?;

    source.seek(SeekFrom::Start(source_files_offset))?;
    let before = copy_exact(source, sink, record.original_offset)?;

    sink.write_all(new_content)?;

    source.seek(SeekFrom::Start(entry_end))?;
    let after = io::copy(source, sink)?;

    sink.flush()?;

    Ok(WriteSummary {
        header_bytes: header.len() as u64,
        files_bytes: before + new_content.len() as u64 + after,
    })
}

fn copy_exact<R: Read, W: Write>(source: &mut R, sink: &mut W, len: u64) -> AsarResult<u64> {
    let copied = io::copy(&mut source.by_ref().take(len), sink)?;
    if copied != len {
        return Err(AsarError::malformed_header(format!(
            "source ended after {copied} of {len} bytes"
        )));
    }
    Ok(copied)
}
