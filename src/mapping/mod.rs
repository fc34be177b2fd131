//! The path-mapping engine: a pure, deterministic function from
//! `(depth, entry_name, parent_path)` to a [`MappingDecision`].

pub mod table;

use std::fmt;

/// A short ASCII token identifying one output repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoId(String);

impl RepoId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RepoId {
    fn from(s: &str) -> Self {
        RepoId::new(s)
    }
}

/// Where a directory entry under `(depth, parent_path)` should end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingDecision {
    /// Recurse into this subdirectory under the same output-repo context.
    Descend,
    /// Ignore this entry entirely.
    Drop,
    /// This entry belongs under `subpath` inside output-repo `repo`; if
    /// `rename` is set, the leaf is renamed on the way in.
    Remap {
        repo: RepoId,
        subpath: String,
        rename: Option<String>,
    },
    /// Keep the entry in the current output-repo at the current path.
    PassThrough,
}

impl MappingDecision {
    pub fn remap(repo: &str, subpath: &str) -> Self {
        MappingDecision::Remap {
            repo: RepoId::new(repo),
            subpath: subpath.to_string(),
            rename: None,
        }
    }

    pub fn remap_renamed(repo: &str, subpath: &str, rename: &str) -> Self {
        MappingDecision::Remap {
            repo: RepoId::new(repo),
            subpath: subpath.to_string(),
            rename: Some(rename.to_string()),
        }
    }
}

/// Computes the mapping decision for one directory entry.
///
/// `parent_path` is the slash-joined path of the entry's *parent*
/// directory (not including `entry_name`), starting from an empty string
/// at the synthetic root. `entry_name` is matched as UTF-8 when possible
/// (the corpus rename table is keyed on exact, occasionally non-ASCII,
/// names) and falls back to lossy matching only for the depth/parent
/// gating that never needs exact bytes.
pub fn map(depth: u32, entry_name: &[u8], parent_path: &str) -> MappingDecision {
    table::lookup(depth, entry_name, parent_path)
}

/// File-extension rewrites applied independently of the mapping table, to
/// every text file that survives to be written into an output repo:
/// `.xhtml`/`.xhtml3` become `.xml`; a trailing `.!` drops the file
/// entirely (`None`). Any other name passes through unchanged.
pub fn rewrite_extension(name: &[u8]) -> Option<Vec<u8>> {
    if name.ends_with(b".!") {
        return None;
    }
    if let Some(stem) = name.strip_suffix(b".xhtml3") {
        let mut out = stem.to_vec();
        out.extend_from_slice(b".xml");
        return Some(out);
    }
    if let Some(stem) = name.strip_suffix(b".xhtml") {
        let mut out = stem.to_vec();
        out.extend_from_slice(b".xml");
        return Some(out);
    }
    Some(name.to_vec())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_zero_only_descends_into_ruscorpora() {
        assert_eq!(map(0, b"ruscorpora", ""), MappingDecision::Descend);
        assert_eq!(map(0, b"whatever", ""), MappingDecision::Drop);
    }

    #[test]
    fn depth_one_trunk_descends_branches_drops() {
        assert_eq!(map(1, b"trunk", "/ruscorpora"), MappingDecision::Descend);
        assert_eq!(map(1, b"branches", "/ruscorpora"), MappingDecision::Drop);
        assert_eq!(map(1, b"tags", "/ruscorpora"), MappingDecision::Drop);
    }
}
