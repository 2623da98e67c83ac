//! Offset bookkeeping across the file tree

use crate::asar::error::{AsarError, AsarResult};
use crate::asar::tree::{Directory, FileTree, Node};

/// Add `delta` to the offset of every file stored after `pivot`
///
/// Entries whose offset is at or before `pivot` keep their position: the
/// bytes in front of the rewritten entry do not move. Returns the number
/// of entries shifted. If any shifted range would overflow `u64` the tree
/// is left unchanged and a `MalformedHeader` error is returned.
pub fn shift_offsets(tree: &mut FileTree, pivot: u64, delta: u64) -> AsarResult<usize> {
    check_shift(tree.root(), pivot, delta, &mut Vec::new())?;
    Ok(shift_directory(tree.root_mut(), pivot, delta))
}

fn check_shift<'a>(
    dir: &'a Directory,
    pivot: u64,
    delta: u64,
    path: &mut Vec<&'a str>,
) -> AsarResult<()> {
    for (name, node) in dir.entries() {
        path.push(name);
        match node {
            Node::Directory(child) => check_shift(child, pivot, delta, path)?,
            Node::File(file) => {
                if let Some(offset) = file.offset
                    && offset > pivot
                    && offset
                        .checked_add(delta)
                        .and_then(|shifted| shifted.checked_add(file.size))
                        .is_none()
                {
                    return Err(AsarError::malformed_header(format!(
                        "shifting '{}' at offset {offset} by {delta} overflows",
                        path.join("/")
                    )));
                }
            }
            Node::Link(_) => {}
        }
        path.pop();
    }
    Ok(())
}

fn shift_directory(dir: &mut Directory, pivot: u64, delta: u64) -> usize {
    let mut shifted = 0;
    for node in dir.nodes_mut() {
        match node {
            Node::Directory(child) => shifted += shift_directory(child, pivot, delta),
            Node::File(file) => {
                if let Some(offset) = file.offset.as_mut()
                    && *offset > pivot
                {
                    *offset += delta;
                    shifted += 1;
                }
            }
            Node::Link(_) => {}
        }
    }
    shifted
}

/// Check that no two packed, non-empty files share bytes
pub fn check_ranges(tree: &FileTree) -> AsarResult<()> {
    let mut ranges: Vec<_> = tree
        .files()
        .into_iter()
        .filter_map(|(path, file)| file.range().map(|range| (range, path)))
        .filter(|(range, _)| !range.is_empty())
        .collect();
    ranges.sort_by_key(|(range, _)| range.start);

    for pair in ranges.windows(2) {
        let (first, first_path) = &pair[0];
        let (second, second_path) = &pair[1];
        if first.end > second.start {
            return Err(AsarError::schema(
                second_path.clone(),
                format!(
                    "bytes {}..{} overlap '{first_path}' at {}..{}",
                    second.start, second.end, first.start, first.end
                ),
            ));
        }
    }

    Ok(())
}
