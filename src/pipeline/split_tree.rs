//! The per-commit multi-rooted split-tree structure: entries destined for
//! every output repo accumulate here during one commit's rewrite, then get
//! materialized bottom-up into persisted tree objects.

use crate::mapping::RepoId;
use crate::store::codec::{compare_entry_names, encode_tree, CodecError, TreeEntry, MODE_DIR};
use crate::store::hash::{ObjectHash, ObjectKind};
use crate::store::loose::{LooseObjectStore, RepoScope, StoreError};
use log::warn;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A mutable directory record: a node with `hash.is_some()` and no
/// children is a leaf reference (file, or an already-materialized
/// subtree); a node with children and `hash.is_none()` needs to be
/// materialized bottom-up.
struct SplitNode {
    mode: String,
    hash: Option<ObjectHash>,
    children: HashMap<Vec<u8>, SplitNode>,
}

impl SplitNode {
    fn new_dir() -> Self {
        Self {
            mode: MODE_DIR.to_string(),
            hash: None,
            children: HashMap::new(),
        }
    }

    fn leaf(mode: &str, hash: ObjectHash) -> Self {
        Self {
            mode: mode.to_string(),
            hash: Some(hash),
            children: HashMap::new(),
        }
    }
}

/// The accumulating structure for one commit, rooted by output-repo name.
#[derive(Default)]
pub struct SplitTree {
    roots: HashMap<RepoId, SplitNode>,
}

impl SplitTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn root_node(&mut self, repo: &RepoId) -> &mut SplitNode {
        self.roots.entry(repo.clone()).or_insert_with(SplitNode::new_dir)
    }

    /// Ensures a directory named `name` exists under `repo`'s root at
    /// `path` (a slash-joined diagnostic path, not a navigation key: use
    /// [`SplitTree::add_dir_at`] to reach nested directories). If it
    /// already exists with a different hash, the existing hash wins and a
    /// diagnostic is logged.
    pub fn add_dir(&mut self, repo: &RepoId, name: &[u8], path: &str, hash: Option<ObjectHash>) {
        let root = self.root_node(repo);
        add_dir_into(root, name, path, hash);
    }

    /// Walks/creates `components` (each a path segment) under `repo`'s
    /// root, returning a mutable reference to the final directory node so
    /// callers can `append` a leaf or nested `add_dir` into it.
    pub fn ensure_path<'a>(&'a mut self, repo: &RepoId, components: &[&[u8]]) -> &'a mut SplitNode {
        let mut node = self.root_node(repo);
        for component in components {
            node = node
                .children
                .entry(component.to_vec())
                .or_insert_with(SplitNode::new_dir);
        }
        node
    }

    /// Adds or replaces a leaf entry under `node`. Duplicates with a
    /// differing hash are diagnosed and the existing entry is kept.
    pub fn append(node: &mut SplitNode, mode: &str, name: &[u8], hash: ObjectHash, path: &str) {
        match node.children.get(name) {
            Some(existing) if existing.hash == Some(hash) => {}
            Some(_) => {
                warn!(
                    "mapping ambiguity: leaf {:?} at {path} already has a different hash, keeping the first",
                    String::from_utf8_lossy(name)
                );
            }
            None => {
                node.children.insert(name.to_vec(), SplitNode::leaf(mode, hash));
            }
        }
    }

    pub fn add_dir_at(node: &mut SplitNode, name: &[u8], path: &str, hash: Option<ObjectHash>) {
        add_dir_into(node, name, path, hash);
    }

    pub fn dir_at<'a>(node: &'a mut SplitNode, name: &[u8]) -> &'a mut SplitNode {
        node.children.entry(name.to_vec()).or_insert_with(SplitNode::new_dir)
    }

    pub fn repos(&self) -> impl Iterator<Item = &RepoId> {
        self.roots.keys()
    }

    /// Sets `repo`'s root node directly to `hash` — used when an entire
    /// remapped directory mounts at the repo's root (`subpath == "/"`):
    /// the mounted subtree's already-materialized hash becomes the
    /// repo's own root tree, with no intervening named entry.
    pub fn set_root_hash(&mut self, repo: &RepoId, hash: ObjectHash) {
        let root = self.root_node(repo);
        if let Some(existing) = root.hash {
            if existing != hash {
                warn!("mapping ambiguity: repo {repo} root already mounted with a different hash, keeping the first");
            }
            return;
        }
        root.hash = Some(hash);
    }

    /// Materializes every root into a persisted tree hash, omitting roots
    /// that end up empty (no content reached this output repo).
    pub fn materialize_all(
        self,
        store: &LooseObjectStore,
    ) -> Result<HashMap<RepoId, ObjectHash>, MaterializeError> {
        let mut out = HashMap::new();
        for (repo, node) in self.roots {
            let scope = RepoScope::Output(repo.clone());
            if let Some(hash) = materialize_node(node, store, &scope, repo.as_str())? {
                out.insert(repo, hash);
            }
        }
        Ok(out)
    }
}

fn add_dir_into(node: &mut SplitNode, name: &[u8], path: &str, hash: Option<ObjectHash>) {
    match node.children.get(name) {
        None => {
            node.children.insert(
                name.to_vec(),
                SplitNode {
                    mode: MODE_DIR.to_string(),
                    hash,
                    children: HashMap::new(),
                },
            );
        }
        Some(existing) => {
            if hash.is_none() {
                return;
            }
            if existing.hash == hash {
                return;
            }
            if existing.hash.is_some() {
                warn!(
                    "mapping ambiguity: dir {:?} at {path} already materialized with a different hash, keeping the first",
                    String::from_utf8_lossy(name)
                );
                return;
            }
            warn!(
                "mapping ambiguity: dir {:?} at {path} has pending children but a forced hash was also proposed, keeping the children",
                String::from_utf8_lossy(name)
            );
        }
    }
}

/// Recursively materializes `node`, returning `None` for an empty
/// directory (no hash, no children) so the caller omits it from its
/// parent — the "no empty directories" rule.
fn materialize_node(
    node: SplitNode,
    store: &LooseObjectStore,
    scope: &RepoScope,
    path: &str,
) -> Result<Option<ObjectHash>, MaterializeError> {
    if let Some(hash) = node.hash {
        return Ok(Some(hash));
    }

    if node.children.is_empty() {
        return Ok(None);
    }

    let mut entries = Vec::with_capacity(node.children.len());
    for (name, child) in node.children {
        let child_path = format!("{path}/{}", String::from_utf8_lossy(&name));
        let child_mode = if child.mode == MODE_DIR {
            MODE_DIR.to_string()
        } else {
            child.mode.clone()
        };
        if let Some(child_hash) = materialize_node(child, store, scope, &child_path)? {
            entries.push(TreeEntry {
                mode: child_mode,
                name,
                hash: child_hash,
            });
        }
    }

    if entries.is_empty() {
        return Ok(None);
    }

    entries.sort_by(|a, b| compare_entry_names(&a.name, a.is_dir(), &b.name, b.is_dir()));
    let payload = encode_tree(&entries)?;
    let hash = store.write(ObjectKind::Tree, &payload, scope)?;
    Ok(Some(hash))
}
