//! Tree and commit payload encoding/decoding.
//!
//! Trees are packed as a sequence of `mode SP name NUL <20-byte hash>`
//! entries; commits are a small text header (`tree`, optional `parent`
//! lines) followed by an opaque body.

use crate::store::hash::ObjectHash;
use bstr::ByteSlice;
use std::cmp::Ordering;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("tree contains duplicate entry name: {0:?}")]
    InvalidTree(Vec<u8>),
    #[error("malformed tree payload: {0}")]
    MalformedTree(&'static str),
    #[error("malformed commit payload: {0}")]
    MalformedCommit(&'static str),
}

/// A single directory entry: Unix-ish mode, raw name bytes, and the hash
/// of the referenced object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: String,
    pub name: Vec<u8>,
    pub hash: ObjectHash,
}

pub const MODE_DIR: &str = "40000";
pub const MODE_FILE: &str = "100644";
pub const MODE_EXEC: &str = "100755";
pub const MODE_SYMLINK: &str = "120000";

impl TreeEntry {
    pub fn is_dir(&self) -> bool {
        self.mode == MODE_DIR
    }

    pub fn name_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        self.name.to_str_lossy()
    }
}

/// Compares two entry names the way a persisted tree orders them:
/// directories sort as if their name carried a trailing `/`.
pub fn compare_entry_names(a_name: &[u8], a_is_dir: bool, b_name: &[u8], b_is_dir: bool) -> Ordering {
    let a_key: Vec<u8> = if a_is_dir {
        a_name.iter().copied().chain(std::iter::once(b'/')).collect()
    } else {
        a_name.to_vec()
    };
    let b_key: Vec<u8> = if b_is_dir {
        b_name.iter().copied().chain(std::iter::once(b'/')).collect()
    } else {
        b_name.to_vec()
    };
    a_key.cmp(&b_key)
}

fn sort_entries(entries: &mut [TreeEntry]) {
    entries.sort_by(|a, b| compare_entry_names(&a.name, a.is_dir(), &b.name, b.is_dir()));
}

/// Sorts `entries` by the directory-aware ordering and packs them as
/// `mode SP name NUL hash` with no separators between entries.
///
/// Fails with [`CodecError::InvalidTree`] if two entries share a name.
pub fn encode_tree(entries: &[TreeEntry]) -> Result<Vec<u8>, CodecError> {
    let mut names = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !names.insert(&entry.name) {
            return Err(CodecError::InvalidTree(entry.name.clone()));
        }
    }

    let mut sorted: Vec<&TreeEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| compare_entry_names(&a.name, a.is_dir(), &b.name, b.is_dir()));

    let mut out = Vec::new();
    for entry in sorted {
        out.extend_from_slice(entry.mode.as_bytes());
        out.push(b' ');
        out.extend_from_slice(&entry.name);
        out.push(0);
        out.extend_from_slice(entry.hash.as_bytes());
    }
    Ok(out)
}

/// Parses a packed tree payload, preserving the entries' original order.
pub fn decode_tree(bytes: &[u8]) -> Result<Vec<TreeEntry>, CodecError> {
    let mut entries = Vec::new();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let space = bytes[pos..]
            .iter()
            .position(|&b| b == b' ')
            .ok_or(CodecError::MalformedTree("missing space after mode"))?;
        let mode_bytes = &bytes[pos..pos + space];
        if mode_bytes.is_empty() || !mode_bytes.iter().all(u8::is_ascii_digit) {
            return Err(CodecError::MalformedTree("mode is not ascii digits"));
        }
        let mode = std::str::from_utf8(mode_bytes)
            .map_err(|_| CodecError::MalformedTree("mode is not utf-8"))?
            .to_string();
        pos += space + 1;

        let nul = bytes[pos..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(CodecError::MalformedTree("missing NUL after name"))?;
        let name = bytes[pos..pos + nul].to_vec();
        pos += nul + 1;

        if pos + ObjectHash::LEN > bytes.len() {
            return Err(CodecError::MalformedTree("truncated hash"));
        }
        let mut raw = [0u8; 20];
        raw.copy_from_slice(&bytes[pos..pos + ObjectHash::LEN]);
        pos += ObjectHash::LEN;

        entries.push(TreeEntry {
            mode,
            name,
            hash: ObjectHash::from_bytes(raw),
        });
    }

    Ok(entries)
}

/// The parsed header of a commit payload: its root tree, its parent
/// hashes in textual order, and the opaque remainder (author, committer,
/// message, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitHeader {
    pub tree: ObjectHash,
    pub parents: Vec<ObjectHash>,
    pub rest: Vec<u8>,
}

/// Parses `tree <hex40>\n` followed by zero or more `parent <hex40>\n`
/// lines; everything after is the opaque body. A linear-chain rewrite
/// only ever looks at `parents.first()`, but a merge-originated input
/// must still parse without panicking.
pub fn decode_commit_header(bytes: &[u8]) -> Result<CommitHeader, CodecError> {
    const TREE_PREFIX: &[u8] = b"tree ";
    const PARENT_PREFIX: &[u8] = b"parent ";

    if !bytes.starts_with(TREE_PREFIX) {
        return Err(CodecError::MalformedCommit("payload does not start with 'tree '"));
    }
    let mut pos = TREE_PREFIX.len();
    let tree = parse_hex40_line(bytes, &mut pos)?;

    let mut parents = Vec::new();
    loop {
        if bytes[pos..].starts_with(PARENT_PREFIX) {
            pos += PARENT_PREFIX.len();
            parents.push(parse_hex40_line(bytes, &mut pos)?);
        } else {
            break;
        }
    }

    Ok(CommitHeader {
        tree,
        parents,
        rest: bytes[pos..].to_vec(),
    })
}

fn parse_hex40_line(bytes: &[u8], pos: &mut usize) -> Result<ObjectHash, CodecError> {
    if *pos + 40 > bytes.len() {
        return Err(CodecError::MalformedCommit("truncated hash line"));
    }
    let hex_bytes = &bytes[*pos..*pos + 40];
    let hex_str = std::str::from_utf8(hex_bytes)
        .map_err(|_| CodecError::MalformedCommit("hash is not utf-8"))?;
    let hash: ObjectHash = hex_str
        .parse()
        .map_err(|_| CodecError::MalformedCommit("hash is not 40 hex chars"))?;
    *pos += 40;
    if bytes.get(*pos) != Some(&b'\n') {
        return Err(CodecError::MalformedCommit("hash line missing newline"));
    }
    *pos += 1;
    Ok(hash)
}
