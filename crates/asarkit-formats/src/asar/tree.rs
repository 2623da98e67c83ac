//! Header file tree
//!
//! The header text is a JSON document whose root is a directory node:
//!
//! ```text
//! {"files":{
//!     "package.json":{"size":42,"offset":"0","integrity":{...}},
//!     "lib":{"files":{...}},
//!     "native.node":{"size":9000,"unpacked":true,"integrity":{...}},
//!     "current":{"link":"lib"}
//! }}
//! ```
//!
//! Nodes are decoded into a tagged [`Node`] so shape mismatches surface as
//! [`AsarError::SchemaError`] at decode time. Every JSON object remembers
//! its member order and any members this crate does not model, so
//! re-encoding an unmodified tree reproduces the original text exactly.

use crate::asar::error::{AsarError, AsarResult};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

const DIRECTORY_KEYS: &[&str] = &["files"];
const FILE_KEYS: &[&str] = &["size", "offset", "integrity", "executable", "unpacked"];
const LINK_KEYS: &[&str] = &["link"];
const INTEGRITY_KEYS: &[&str] = &["algorithm", "hash", "blockSize", "blocks"];

/// Member order and unmodelled members of one JSON object
#[derive(Debug, Clone, Default)]
struct Layout {
    order: Vec<String>,
    extra: Map<String, Value>,
}

impl Layout {
    fn from_object(object: &Map<String, Value>, known: &[&str]) -> Self {
        Self {
            order: object.keys().cloned().collect(),
            extra: object
                .iter()
                .filter(|(key, _)| !known.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }

    /// Recorded order, followed by any known member that was never seen
    fn keys<'a>(&'a self, known: &'a [&'a str]) -> impl Iterator<Item = &'a str> + 'a {
        let seen = self.order.iter().map(String::as_str);
        let unseen = known
            .iter()
            .copied()
            .filter(move |key| !self.order.iter().any(|k| k == key));
        seen.chain(unseen)
    }

    fn serialize_extra<M: SerializeMap>(&self, key: &str, map: &mut M) -> Result<(), M::Error> {
        match self.extra.get(key) {
            Some(value) => map.serialize_entry(key, value),
            None => Ok(()),
        }
    }
}

// Member order is presentation only
impl PartialEq for Layout {
    fn eq(&self, other: &Self) -> bool {
        self.extra == other.extra
    }
}

fn display_path(path: &[String]) -> String {
    path.join("/")
}

/// A node in the header tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Directory with named children
    Directory(Directory),
    /// File with a byte range in the archive (or unpacked beside it)
    File(FileEntry),
    /// Symbolic link to another path inside the archive
    Link(Link),
}

impl Node {
    /// Get the file entry if this node is a file
    pub fn as_file(&self) -> Option<&FileEntry> {
        match self {
            Node::File(file) => Some(file),
            _ => None,
        }
    }

    /// Get the directory if this node is a directory
    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            Node::Directory(dir) => Some(dir),
            _ => None,
        }
    }

    /// Short name of the node kind, used in error messages
    pub const fn kind(&self) -> &'static str {
        match self {
            Node::Directory(_) => "directory",
            Node::File(_) => "file",
            Node::Link(_) => "link",
        }
    }

    fn from_value(value: Value, path: &mut Vec<String>) -> AsarResult<Self> {
        let Value::Object(object) = value else {
            return Err(AsarError::schema(
                display_path(path),
                "expected a JSON object",
            ));
        };

        if object.contains_key("files") {
            Directory::from_object(object, path).map(Node::Directory)
        } else if object.contains_key("link") {
            Link::from_object(&object, path).map(Node::Link)
        } else {
            FileEntry::from_object(&object, path).map(Node::File)
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Directory(dir) => dir.serialize(serializer),
            Node::File(file) => file.serialize(serializer),
            Node::Link(link) => link.serialize(serializer),
        }
    }
}

/// Directory node; children keep their header order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directory {
    entries: Vec<(String, Node)>,
    layout: Layout,
}

impl Directory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a direct child
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, node)| node)
    }

    /// Look up a direct child mutably
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.entries
            .iter_mut()
            .find(|(entry, _)| entry == name)
            .map(|(_, node)| node)
    }

    /// Insert a child, replacing an existing one of the same name in place
    pub fn insert(&mut self, name: impl Into<String>, node: Node) {
        let name = name.into();
        match self.get_mut(&name) {
            Some(existing) => *existing = node,
            None => self.entries.push((name, node)),
        }
    }

    /// Builder form of [`Directory::insert`]
    pub fn with(mut self, name: impl Into<String>, node: Node) -> Self {
        self.insert(name, node);
        self
    }

    /// Children in header order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Children in header order, mutably
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.entries.iter_mut().map(|(_, node)| node)
    }

    /// Number of direct children
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory has no children
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn from_object(mut object: Map<String, Value>, path: &mut Vec<String>) -> AsarResult<Self> {
        let layout = Layout::from_object(&object, DIRECTORY_KEYS);
        let Some(Value::Object(files)) = object.remove("files") else {
            return Err(AsarError::schema(
                display_path(path),
                "'files' member must be an object",
            ));
        };

        let mut entries = Vec::with_capacity(files.len());
        for (name, child) in files {
            path.push(name.clone());
            let node = Node::from_value(child, path)?;
            path.pop();
            entries.push((name, node));
        }

        Ok(Self { entries, layout })
    }
}

struct Children<'a>(&'a [(String, Node)]);

impl Serialize for Children<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, node) in self.0 {
            map.serialize_entry(name, node)?;
        }
        map.end()
    }
}

impl Serialize for Directory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for key in self.layout.keys(DIRECTORY_KEYS) {
            match key {
                "files" => map.serialize_entry(key, &Children(&self.entries))?,
                other => self.layout.serialize_extra(other, &mut map)?,
            }
        }
        map.end()
    }
}

/// File node
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    /// Offset relative to the start of the files region; `None` when unpacked
    pub offset: Option<u64>,
    /// Content length in bytes
    pub size: u64,
    /// Block and whole-content digests, when the producer recorded them
    pub integrity: Option<Integrity>,
    /// `executable` member, if present
    pub executable: Option<bool>,
    /// `unpacked` member, if present
    pub unpacked: Option<bool>,
    /// The source wrote `offset` as a JSON number rather than a string
    numeric_offset: bool,
    layout: Layout,
}

impl FileEntry {
    /// Create a packed file entry
    pub fn new(offset: u64, size: u64) -> Self {
        Self {
            offset: Some(offset),
            size,
            integrity: None,
            executable: None,
            unpacked: None,
            numeric_offset: false,
            layout: Layout::default(),
        }
    }

    /// Attach an integrity record
    pub fn with_integrity(mut self, integrity: Integrity) -> Self {
        self.integrity = Some(integrity);
        self
    }

    /// Whether the content lives outside the archive
    pub fn is_unpacked(&self) -> bool {
        self.unpacked == Some(true)
    }

    /// Byte range inside the files region, if the entry is packed
    pub fn range(&self) -> Option<std::ops::Range<u64>> {
        if self.is_unpacked() {
            return None;
        }
        self.offset
            .map(|offset| offset..offset.saturating_add(self.size))
    }

    fn from_object(object: &Map<String, Value>, path: &[String]) -> AsarResult<Self> {
        let at = || display_path(path);

        let size = object
            .get("size")
            .and_then(Value::as_u64)
            .ok_or_else(|| AsarError::schema(at(), "missing or non-integer 'size'"))?;

        let offset = match object.get("offset") {
            None => None,
            Some(Value::String(text)) => Some(text.parse::<u64>().map_err(|e| {
                AsarError::schema(at(), format!("offset '{text}' is not a decimal integer: {e}"))
            })?),
            Some(Value::Number(number)) => Some(
                number
                    .as_u64()
                    .ok_or_else(|| AsarError::schema(at(), "offset must be non-negative"))?,
            ),
            Some(_) => return Err(AsarError::schema(at(), "offset must be a decimal string")),
        };
        let numeric_offset = matches!(object.get("offset"), Some(Value::Number(_)));

        let integrity = object
            .get("integrity")
            .map(|value| Integrity::from_value(value, path))
            .transpose()?;

        let flag = |key: &str| -> AsarResult<Option<bool>> {
            object
                .get(key)
                .map(|value| {
                    value
                        .as_bool()
                        .ok_or_else(|| AsarError::schema(at(), format!("'{key}' must be a boolean")))
                })
                .transpose()
        };

        let unpacked = flag("unpacked")?;
        if let Some(offset) = offset
            && unpacked != Some(true)
            && offset.checked_add(size).is_none()
        {
            return Err(AsarError::schema(
                at(),
                format!("offset {offset} plus size {size} overflows"),
            ));
        }

        Ok(Self {
            offset,
            size,
            integrity,
            executable: flag("executable")?,
            unpacked,
            numeric_offset,
            layout: Layout::from_object(object, FILE_KEYS),
        })
    }
}

impl Serialize for FileEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for key in self.layout.keys(FILE_KEYS) {
            match key {
                "size" => map.serialize_entry(key, &self.size)?,
                // Offsets are strings so values above 2^53 survive JavaScript
                // readers; a source that wrote a number gets a number back
                "offset" => match self.offset {
                    Some(offset) if self.numeric_offset => map.serialize_entry(key, &offset)?,
                    Some(offset) => map.serialize_entry(key, &offset.to_string())?,
                    None => {}
                },
                "integrity" => {
                    if let Some(integrity) = &self.integrity {
                        map.serialize_entry(key, integrity)?;
                    }
                }
                "executable" => {
                    if let Some(flag) = self.executable {
                        map.serialize_entry(key, &flag)?;
                    }
                }
                "unpacked" => {
                    if let Some(flag) = self.unpacked {
                        map.serialize_entry(key, &flag)?;
                    }
                }
                other => self.layout.serialize_extra(other, &mut map)?,
            }
        }
        map.end()
    }
}

/// Symbolic link node
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Link target, relative to the archive root
    pub link: String,
    layout: Layout,
}

impl Link {
    /// Create a link node
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            link: target.into(),
            layout: Layout::default(),
        }
    }

    fn from_object(object: &Map<String, Value>, path: &[String]) -> AsarResult<Self> {
        let link = object
            .get("link")
            .and_then(Value::as_str)
            .ok_or_else(|| AsarError::schema(display_path(path), "'link' must be a string"))?;
        Ok(Self {
            link: link.to_string(),
            layout: Layout::from_object(object, LINK_KEYS),
        })
    }
}

impl Serialize for Link {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for key in self.layout.keys(LINK_KEYS) {
            match key {
                "link" => map.serialize_entry(key, &self.link)?,
                other => self.layout.serialize_extra(other, &mut map)?,
            }
        }
        map.end()
    }
}

/// Integrity record of a file entry
#[derive(Debug, Clone, PartialEq)]
pub struct Integrity {
    /// Digest algorithm name, e.g. `"SHA256"`
    pub algorithm: String,
    /// Hex digest of the whole content
    pub hash: String,
    /// Bytes per block
    pub block_size: u32,
    /// Hex digest of each block, in order
    pub blocks: Vec<String>,
    layout: Layout,
}

impl Integrity {
    /// Create an integrity record
    pub fn new(
        algorithm: impl Into<String>,
        hash: impl Into<String>,
        block_size: u32,
        blocks: Vec<String>,
    ) -> Self {
        Self {
            algorithm: algorithm.into(),
            hash: hash.into(),
            block_size,
            blocks,
            layout: Layout::default(),
        }
    }

    /// Replace the digests, keeping algorithm, block size and member order
    pub(crate) fn with_digests(&self, hash: String, blocks: Vec<String>) -> Self {
        Self {
            hash,
            blocks,
            ..self.clone()
        }
    }

    fn from_value(value: &Value, path: &[String]) -> AsarResult<Self> {
        let at = || format!("{}#integrity", display_path(path));
        let Value::Object(object) = value else {
            return Err(AsarError::schema(at(), "expected an object"));
        };

        let text = |key: &str| -> AsarResult<String> {
            object
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| AsarError::schema(at(), format!("missing string '{key}'")))
        };

        let block_size = object
            .get("blockSize")
            .and_then(Value::as_u64)
            .and_then(|size| u32::try_from(size).ok())
            .ok_or_else(|| AsarError::schema(at(), "missing or out-of-range 'blockSize'"))?;

        let blocks = object
            .get("blocks")
            .and_then(Value::as_array)
            .ok_or_else(|| AsarError::schema(at(), "missing 'blocks' array"))?
            .iter()
            .map(|block| {
                block
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| AsarError::schema(at(), "block digests must be strings"))
            })
            .collect::<AsarResult<Vec<_>>>()?;

        Ok(Self {
            algorithm: text("algorithm")?,
            hash: text("hash")?,
            block_size,
            blocks,
            layout: Layout::from_object(object, INTEGRITY_KEYS),
        })
    }
}

impl Serialize for Integrity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for key in self.layout.keys(INTEGRITY_KEYS) {
            match key {
                "algorithm" => map.serialize_entry(key, &self.algorithm)?,
                "hash" => map.serialize_entry(key, &self.hash)?,
                "blockSize" => map.serialize_entry(key, &self.block_size)?,
                "blocks" => map.serialize_entry(key, &self.blocks)?,
                other => self.layout.serialize_extra(other, &mut map)?,
            }
        }
        map.end()
    }
}

/// The decoded header tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileTree {
    root: Directory,
}

impl FileTree {
    /// Wrap a root directory
    pub fn new(root: Directory) -> Self {
        Self { root }
    }

    /// Root directory
    pub fn root(&self) -> &Directory {
        &self.root
    }

    /// Root directory, mutably
    pub fn root_mut(&mut self) -> &mut Directory {
        &mut self.root
    }

    /// Decode header text
    pub fn from_json(text: &str) -> AsarResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| AsarError::invalid_encoding(format!("header is not valid JSON: {e}")))?;

        match Node::from_value(value, &mut Vec::new())? {
            Node::Directory(root) => Ok(Self { root }),
            other => Err(AsarError::schema(
                "",
                format!("root must be a directory, found a {}", other.kind()),
            )),
        }
    }

    /// Encode as compact header text
    pub fn to_json(&self) -> AsarResult<String> {
        serde_json::to_string(&self.root)
            .map_err(|e| AsarError::invalid_encoding(format!("failed to encode header: {e}")))
    }

    /// Look up a node by path components
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&Node> {
        let (last, parents) = path.split_last()?;
        let mut dir = &self.root;
        for name in parents {
            dir = dir.get(name.as_ref())?.as_directory()?;
        }
        dir.get(last.as_ref())
    }

    /// Every file entry with its slash-joined path, in header order
    pub fn files(&self) -> Vec<(String, &FileEntry)> {
        fn walk<'a>(dir: &'a Directory, prefix: &str, out: &mut Vec<(String, &'a FileEntry)>) {
            for (name, node) in dir.entries() {
                let path = if prefix.is_empty() {
                    name.to_string()
                } else {
                    format!("{prefix}/{name}")
                };
                match node {
                    Node::Directory(child) => walk(child, &path, out),
                    Node::File(file) => out.push((path, file)),
                    Node::Link(_) => {}
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.root, "", &mut out);
        out
    }
}
