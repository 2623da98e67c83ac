//! Entry mutation
//!
//! A [`Mutation`] names one file entry and a literal marker substitution.
//! Applying it rewrites the entry's content, refreshes its integrity record,
//! shifts every later entry and re-encodes the header, all in memory, before
//! a single byte of the new archive is written.

use crate::asar::error::{AsarError, AsarResult};
use crate::asar::header::ArchiveHeader;
use crate::asar::offsets::{check_ranges, shift_offsets};
use crate::asar::tree::{FileEntry, FileTree, Node};
use crate::asar::writer::{WriteSummary, write_archive};
use asarkit_crypto::ContentHash;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::Path;
use tracing::{debug, info};

/// Which entry to rewrite and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    /// Directory names followed by the file name
    pub target_path: Vec<String>,
    /// Literal text to look for
    pub find: String,
    /// Literal text to put in its place
    pub replace: String,
}

impl Mutation {
    /// Create a mutation from path components
    pub fn new<I, S>(target_path: I, find: impl Into<String>, replace: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target_path: target_path.into_iter().map(Into::into).collect(),
            find: find.into(),
            replace: replace.into(),
        }
    }

    /// Split a slash-separated archive path into components
    pub fn split_path(path: &str) -> Vec<String> {
        path.split('/')
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Slash-joined target path
    pub fn path(&self) -> String {
        self.target_path.join("/")
    }
}

/// What a mutation changed; lives until the new header is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// Path of the rewritten entry
    pub target_path: Vec<String>,
    /// Entry offset, unchanged by the mutation
    pub original_offset: u64,
    /// Entry size before
    pub original_size: u64,
    /// Entry size after
    pub new_size: u64,
}

impl MutationRecord {
    /// Growth of the entry in bytes
    pub const fn size_delta(&self) -> u64 {
        self.new_size.saturating_sub(self.original_size)
    }

    /// Slash-joined target path
    pub fn path(&self) -> String {
        self.target_path.join("/")
    }
}

/// Result of patching a whole archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    /// What changed in the tree
    pub record: MutationRecord,
    /// Digest of the header text before the edit
    pub old_header_digest: ContentHash,
    /// Digest of the header text after the edit
    pub new_header_digest: ContentHash,
    /// Bytes written
    pub summary: WriteSummary,
}

/// Find the file entry at `path`
pub fn locate<'a, S: AsRef<str>>(
    tree: &'a mut FileTree,
    path: &[S],
) -> AsarResult<&'a mut FileEntry> {
    let Some((last, parents)) = path.split_last() else {
        return Err(AsarError::schema("", "target path is empty"));
    };

    let mut walked: Vec<&str> = Vec::with_capacity(path.len());
    let mut dir = tree.root_mut();
    for name in parents {
        walked.push(name.as_ref());
        dir = match dir.get_mut(name.as_ref()) {
            Some(Node::Directory(child)) => child,
            Some(other) => {
                return Err(AsarError::schema(
                    walked.join("/"),
                    format!("expected a directory, found a {}", other.kind()),
                ));
            }
            None => return Err(AsarError::schema(walked.join("/"), "no such entry")),
        };
    }

    walked.push(last.as_ref());
    match dir.get_mut(last.as_ref()) {
        Some(Node::File(file)) => Ok(file),
        Some(other) => Err(AsarError::schema(
            walked.join("/"),
            format!("expected a file, found a {}", other.kind()),
        )),
        None => Err(AsarError::schema(walked.join("/"), "no such entry")),
    }
}

/// Replace every occurrence of `find` in UTF-8 `content`
///
/// An empty `find` matches nothing.
pub fn apply(content: &[u8], find: &str, replace: &str) -> AsarResult<Vec<u8>> {
    let text = std::str::from_utf8(content)
        .map_err(|e| AsarError::invalid_encoding(format!("entry content is not UTF-8: {e}")))?;
    if find.is_empty() {
        return Ok(content.to_vec());
    }
    Ok(text.replace(find, replace).into_bytes())
}

/// Apply `mutation` to the tree given the entry's current content
///
/// Updates the entry's size and integrity and shifts later offsets. The
/// tree is left untouched when an error is returned.
pub fn rewrite_entry(
    tree: &mut FileTree,
    mutation: &Mutation,
    original_offset: u64,
    original: &[u8],
) -> AsarResult<(MutationRecord, Vec<u8>)> {
    let new_content = apply(original, &mutation.find, &mutation.replace)?;
    let original_size = original.len() as u64;
    let new_size = new_content.len() as u64;

    // No growth means the marker is gone: already patched, or the bundle changed
    if new_size <= original_size {
        return Err(AsarError::NoOpPatch {
            path: mutation.path(),
            original_size,
            new_size,
        });
    }

    // Edits go to a copy so any failure below leaves `tree` as it was
    let mut updated = tree.clone();
    let entry = locate(&mut updated, &mutation.target_path)?;
    let integrity = entry
        .integrity
        .as_ref()
        .map(|integrity| integrity.recompute(&new_content))
        .transpose()?;
    entry.integrity = integrity;
    entry.size = new_size;

    let record = MutationRecord {
        target_path: mutation.target_path.clone(),
        original_offset,
        original_size,
        new_size,
    };
    let shifted = shift_offsets(&mut updated, original_offset, record.size_delta())?;
    check_ranges(&updated)?;

    *tree = updated;
    debug!(
        path = %record.path(),
        original_size,
        new_size,
        shifted,
        "rewrote entry"
    );
    Ok((record, new_content))
}

/// Read the header of `source`, apply `mutation`, and stream the result to `sink`
pub fn patch_archive<R, W>(
    source: &mut R,
    sink: &mut W,
    mutation: &Mutation,
) -> AsarResult<PatchOutcome>
where
    R: Read + Seek,
    W: Write,
{
    let mut header = ArchiveHeader::read(source)?;
    let files_offset = header.files_offset();

    let entry = locate(&mut header.tree, &mutation.target_path)?;
    let Some(range) = entry.range() else {
        return Err(AsarError::schema(
            mutation.path(),
            "entry is unpacked; its content is not inside the archive",
        ));
    };

    let original_offset = range.start;
    let original = read_entry(source, files_offset, &mutation.path(), range)?;

    let (record, new_content) = rewrite_entry(&mut header.tree, mutation, original_offset, &original)?;
    let encoded = header.encode()?;
    let summary = write_archive(
        source,
        files_offset,
        &record,
        &new_content,
        &encoded.to_bytes()?,
        sink,
    )?;

    Ok(PatchOutcome {
        record,
        old_header_digest: header.source_digest(),
        new_header_digest: encoded.digest(),
        summary,
    })
}

/// Read the bytes of the entry at `range` within the files region
fn read_entry<R: Read + Seek>(
    source: &mut R,
    files_offset: u64,
    path: &str,
    range: Range<u64>,
) -> AsarResult<Vec<u8>> {
    let len = usize::try_from(range.end - range.start)
        .map_err(|_| AsarError::malformed_header("entry too large for this platform"))?;
    let mut content = vec![0u8; len];
    let entry_start = files_offset.checked_add(range.start).ok_or_else(|| {
        AsarError::malformed_header(format!(
            "'{path}' at offset {} lies beyond any addressable position",
            range.start
        ))
    })?;
    source.seek(SeekFrom::Start(entry_start))?;
    source.read_exact(&mut content).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            AsarError::malformed_header(format!(
                "archive ends inside '{path}' ({}..{})",
                range.start, range.end
            ))
        } else {
            AsarError::Io(e)
        }
    })?;
    Ok(content)
}

/// Check the entry at `path` against its integrity record
///
/// Returns `false` when the entry carries no integrity record, so there is
/// nothing to check.
///
/// # Errors
///
/// [`AsarError::IntegrityMismatch`] when the content and record disagree.
pub fn verify_entry<R, S>(source: &mut R, path: &[S]) -> AsarResult<bool>
where
    R: Read + Seek,
    S: AsRef<str>,
{
    let mut header = ArchiveHeader::read(source)?;
    let files_offset = header.files_offset();
    let joined = path.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("/");

    let entry = locate(&mut header.tree, path)?;
    let Some(range) = entry.range() else {
        return Err(AsarError::schema(
            joined,
            "entry is unpacked; its content is not inside the archive",
        ));
    };
    let Some(integrity) = entry.integrity.clone() else {
        return Ok(false);
    };

    let content = read_entry(source, files_offset, &joined, range)?;
    if integrity.verify(&content)? {
        Ok(true)
    } else {
        Err(AsarError::IntegrityMismatch { path: joined })
    }
}

/// [`patch_archive`] between two files; `destination` is created or truncated
pub fn patch_archive_file(
    source: &Path,
    destination: &Path,
    mutation: &Mutation,
) -> AsarResult<PatchOutcome> {
    let mut reader = BufReader::new(File::open(source)?);
    let mut writer = BufWriter::new(File::create(destination)?);

    let outcome = patch_archive(&mut reader, &mut writer, mutation)?;

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    info!(
        source = %source.display(),
        destination = %destination.display(),
        entry = %outcome.record.path(),
        size_delta = outcome.record.size_delta(),
        bytes = outcome.summary.total(),
        "wrote patched archive"
    );
    Ok(outcome)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::asar::header::EncodedHeader;
    use crate::asar::header::Prologue;
    use crate::asar::tree::Directory;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn build_archive(text: &str, files: &[u8]) -> Vec<u8> {
        let mut bytes = EncodedHeader {
            prologue: Prologue::for_text_length(4, text.len()).unwrap(),
            text: text.to_string(),
        }
        .to_bytes()
        .unwrap();
        bytes.extend_from_slice(files);
        bytes
    }

    #[test]
    fn test_locate_nested_file() {
        let mut tree = FileTree::from_json(
            r#"{"files":{".webpack":{"files":{"main":{"files":{"index.js":{"size":3,"offset":"0"}}}}}}}"#,
        )
        .unwrap();
        let entry = locate(&mut tree, &[".webpack", "main", "index.js"]).unwrap();
        assert_eq!(entry.size, 3);
    }

    #[test]
    fn test_locate_errors_name_the_failing_component() {
        let mut tree = FileTree::from_json(
            r#"{"files":{"a":{"files":{"f":{"size":1,"offset":"0"}}},"l":{"link":"a"}}}"#,
        )
        .unwrap();

        let cases: [(&[&str], &str); 5] = [
            (&["missing", "f"], "missing"),
            (&["a", "missing"], "a/missing"),
            (&["a", "f", "deeper"], "a/f"),
            (&["a"], "a"),
            (&["l"], "l"),
        ];
        for (path, expected) in cases {
            match locate(&mut tree, path) {
                Err(AsarError::SchemaError { path, .. }) => assert_eq!(path, expected),
                other => panic!("{expected}: unexpected {other:?}"),
            }
        }

        let empty: [&str; 0] = [];
        assert!(matches!(
            locate(&mut tree, &empty),
            Err(AsarError::SchemaError { .. })
        ));
    }

    #[test]
    fn test_apply_replaces_every_occurrence() {
        let out = apply(b"ab-ab-ab", "ab", "abc").unwrap();
        assert_eq!(out, b"abc-abc-abc");
        assert_eq!(apply(b"xyz", "", "q").unwrap(), b"xyz");
        assert!(matches!(
            apply(&[0xff, 0xfe], "a", "b"),
            Err(AsarError::InvalidEncoding { .. })
        ));
    }

    #[test]
    fn test_two_entry_scenario() {
        let text = r#"{"files":{"a":{"offset":"0","size":4},"b":{"offset":"4","size":3}}}"#;
        let archive = build_archive(text, b"XXXXYYY");
        let mutation = Mutation::new(["a"], "XXXX", "XXXXZZ");

        let mut out = Vec::new();
        let outcome = patch_archive(&mut Cursor::new(&archive), &mut out, &mutation).unwrap();

        assert_eq!(outcome.record.size_delta(), 2);
        assert_eq!(outcome.summary.files_bytes, 9);

        let header = ArchiveHeader::parse(&out).unwrap();
        assert_eq!(
            header.source_text(),
            r#"{"files":{"a":{"offset":"0","size":6},"b":{"offset":"6","size":3}}}"#
        );
        assert_eq!(&out[header.files_offset() as usize..], b"XXXXZZYYY");
        assert_ne!(outcome.old_header_digest, outcome.new_header_digest);
        assert_eq!(outcome.new_header_digest, header.source_digest());
    }

    #[test]
    fn test_no_growth_is_rejected_and_tree_untouched() {
        let mut tree = FileTree::from_json(
            r#"{"files":{"a":{"offset":"0","size":4},"b":{"offset":"4","size":3}}}"#,
        )
        .unwrap();
        let before = tree.clone();

        let missing = Mutation::new(["a"], "QQ", "QQQ");
        let err = rewrite_entry(&mut tree, &missing, 0, b"XXXX").unwrap_err();
        assert!(matches!(err, AsarError::NoOpPatch { original_size: 4, new_size: 4, .. }));

        let shrink = Mutation::new(["a"], "XXXX", "X");
        let err = rewrite_entry(&mut tree, &shrink, 0, b"XXXX").unwrap_err();
        assert!(matches!(err, AsarError::NoOpPatch { new_size: 1, .. }));

        assert_eq!(tree, before);
    }

    #[test]
    fn test_failed_range_check_leaves_tree_untouched() {
        // "b" already overlaps "c"; growing "a" shifts both but cannot fix that
        let mut tree = FileTree::from_json(
            r#"{"files":{"a":{"offset":"0","size":4},"b":{"offset":"4","size":3},"c":{"offset":"6","size":2}}}"#,
        )
        .unwrap();
        let before = tree.clone();

        let err = rewrite_entry(&mut tree, &Mutation::new(["a"], "XX", "XXX"), 0, b"XXXX")
            .unwrap_err();
        assert!(matches!(err, AsarError::SchemaError { ref path, .. } if path == "c"));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_sibling_near_offset_limit_is_rejected() {
        let mut tree = FileTree::new(
            Directory::new()
                .with("a", Node::File(FileEntry::new(0, 4)))
                .with("b", Node::File(FileEntry::new(u64::MAX - 3, 3))),
        );
        let before = tree.clone();

        let err = rewrite_entry(&mut tree, &Mutation::new(["a"], "XX", "XXXX"), 0, b"XXXX")
            .unwrap_err();
        assert!(matches!(err, AsarError::MalformedHeader { .. }), "{err:?}");
        assert_eq!(tree, before);
    }

    #[test]
    fn test_overflowing_offset_in_archive_is_an_error() {
        let text = r#"{"files":{"a":{"offset":"0","size":4},"b":{"offset":"18446744073709551615","size":3}}}"#;
        let archive = build_archive(text, b"XXXXYYY");
        let mut out = Vec::new();
        let err = patch_archive(
            &mut Cursor::new(&archive),
            &mut out,
            &Mutation::new(["a"], "XXXX", "XXXXZZ"),
        )
        .unwrap_err();
        assert!(matches!(err, AsarError::SchemaError { ref path, .. } if path == "b"), "{err:?}");
        assert!(out.is_empty());
    }

    #[test]
    fn test_unpacked_target_is_rejected() {
        let text = r#"{"files":{"a":{"size":4,"unpacked":true}}}"#;
        let archive = build_archive(text, b"");
        let mut out = Vec::new();
        let err = patch_archive(
            &mut Cursor::new(&archive),
            &mut out,
            &Mutation::new(["a"], "x", "xy"),
        )
        .unwrap_err();
        assert!(matches!(err, AsarError::SchemaError { .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_truncated_entry_is_malformed() {
        let text = r#"{"files":{"a":{"offset":"0","size":10}}}"#;
        let archive = build_archive(text, b"short");
        let mut out = Vec::new();
        let err = patch_archive(
            &mut Cursor::new(&archive),
            &mut out,
            &Mutation::new(["a"], "s", "ss"),
        )
        .unwrap_err();
        assert!(matches!(err, AsarError::MalformedHeader { .. }));
    }

    #[test]
    fn test_verify_entry_checks_integrity() {
        let text = r#"{"files":{"a":{"offset":"0","size":4},"b":{"offset":"4","size":3}}}"#;
        let mut tree = FileTree::from_json(text).unwrap();
        let integrity = crate::asar::compute_integrity(b"XXXX", "SHA256", 2).unwrap();
        locate(&mut tree, &["a"]).unwrap().integrity = Some(integrity);
        let archive = build_archive(&tree.to_json().unwrap(), b"XXXXYYY");

        let mut out = Vec::new();
        patch_archive(
            &mut Cursor::new(&archive),
            &mut out,
            &Mutation::new(["a"], "XXXX", "XXXXZZ"),
        )
        .unwrap();
        assert!(verify_entry(&mut Cursor::new(&out), &["a"]).unwrap());
        assert!(!verify_entry(&mut Cursor::new(&out), &["b"]).unwrap());

        // Flip a byte of "a" in the files region
        let files_offset = ArchiveHeader::parse(&out).unwrap().files_offset() as usize;
        out[files_offset + 5] = b'Q';
        let err = verify_entry(&mut Cursor::new(&out), &["a"]).unwrap_err();
        assert!(matches!(err, AsarError::IntegrityMismatch { ref path } if path == "a"));
        assert!(err.is_corruption_error());
    }

    #[test]
    fn test_split_path() {
        assert_eq!(
            Mutation::split_path("/.webpack/main//index.js"),
            [".webpack", "main", "index.js"]
        );
        assert_eq!(
            Mutation::new(Mutation::split_path("a/b"), "x", "y").path(),
            "a/b"
        );
    }
}
