//! Blob Collection Pass: walks every commit's root tree under the mapping
//! rules and enumerates the `(output-repo, blob-hash)` pairs that will
//! need transcoding, deduplicating identical subtrees across commits.

use crate::mapping::{self, MappingDecision, RepoId};
use crate::pipeline::cache::SharedCache;
use crate::pipeline::{extension_of, BIN_EXTS, KILL_EXTS};
use crate::store::codec::decode_tree;
use crate::store::hash::ObjectHash;
use crate::store::loose::{LooseObjectStore, RepoScope, StoreError};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Codec(#[from] crate::store::codec::CodecError),
}

/// Shared dedupe cache: `(repo, source-tree-hash) -> seen`.
pub type CollectedCache = SharedCache<(RepoId, ObjectHash), ()>;

/// Walks one commit's root tree and returns every `(repo, blob-hash)` this
/// commit would transcode, as a map from blob hash to the set of repos
/// that need a translated copy.
pub fn collect_commit(
    store: &LooseObjectStore,
    collected: &CollectedCache,
    root: ObjectHash,
) -> Result<HashMap<ObjectHash, HashSet<RepoId>>, CollectError> {
    let mut out: HashMap<ObjectHash, HashSet<RepoId>> = HashMap::new();
    scan(store, collected, root, 0, "", &mut out)?;
    Ok(out)
}

fn scan(
    store: &LooseObjectStore,
    collected: &CollectedCache,
    hash: ObjectHash,
    depth: u32,
    parent_path: &str,
    out: &mut HashMap<ObjectHash, HashSet<RepoId>>,
) -> Result<(), CollectError> {
    let (_, _, payload) = store.read(&hash, &RepoScope::Source)?;
    let entries = decode_tree(&payload)?;

    for entry in entries {
        let child_path = format!("{parent_path}/{}", entry.name_str_lossy());
        match mapping::map(depth, &entry.name, parent_path) {
            MappingDecision::Drop => {}
            MappingDecision::Descend => {
                if entry.is_dir() {
                    scan(store, collected, entry.hash, depth + 1, &child_path, out)?;
                }
            }
            MappingDecision::Remap { repo, subpath, .. } => {
                if subpath.is_empty() {
                    // Empty (non-`/`) subpath: descend in place through the
                    // table rather than mount, discarding `repo`.
                    if entry.is_dir() {
                        scan(store, collected, entry.hash, depth + 1, &child_path, out)?;
                    }
                } else if entry.is_dir() {
                    mount(store, collected, &repo, entry.hash, depth + 1, &child_path, out)?;
                } else if should_collect(&entry.name) {
                    out.entry(entry.hash).or_default().insert(repo);
                }
            }
            // The mapping table never produces this above the fringe; it
            // only arises inside `mount`'s below-the-fringe walk, which
            // never calls `map()` in the first place.
            MappingDecision::PassThrough => {
                log::warn!("unexpected PassThrough from map() at {child_path}, dropping");
            }
        }
    }
    Ok(())
}

/// The below-the-fringe (post-remap) walk: every descendant belongs to
/// `repo` without any further table lookups.
fn mount(
    store: &LooseObjectStore,
    collected: &CollectedCache,
    repo: &RepoId,
    hash: ObjectHash,
    depth: u32,
    parent_path: &str,
    out: &mut HashMap<ObjectHash, HashSet<RepoId>>,
) -> Result<(), CollectError> {
    let outcome = collected.set_if_absent((repo.clone(), hash), ());
    if !outcome.won {
        return Ok(());
    }

    let (_, _, payload) = store.read(&hash, &RepoScope::Source)?;
    let entries = decode_tree(&payload)?;

    for entry in entries {
        let child_path = format!("{parent_path}/{}", entry.name_str_lossy());
        if entry.is_dir() {
            mount(store, collected, repo, entry.hash, depth + 1, &child_path, out)?;
        } else if should_collect(&entry.name) {
            out.entry(entry.hash).or_default().insert(repo.clone());
        }
    }
    Ok(())
}

/// A file is worth transcoding unless it is `.gitignore`, a killed
/// extension, or a known binary extension.
fn should_collect(name: &[u8]) -> bool {
    if name == b".gitignore" {
        return false;
    }
    let ext = extension_of(name);
    !(KILL_EXTS.contains(ext.as_str()) || BIN_EXTS.contains(ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::codec::{encode_tree, TreeEntry, MODE_DIR, MODE_FILE};
    use crate::store::hash::{hash_of, ObjectKind};
    use tempfile::tempdir;

    fn write_blob(store: &LooseObjectStore, content: &[u8]) -> ObjectHash {
        store.write(ObjectKind::Blob, content, &RepoScope::Source).unwrap()
    }

    fn write_tree(store: &LooseObjectStore, entries: Vec<TreeEntry>) -> ObjectHash {
        let payload = encode_tree(&entries).unwrap();
        store.write(ObjectKind::Tree, &payload, &RepoScope::Source).unwrap()
    }

    #[test]
    fn collects_text_blob_under_mapped_repo_and_excludes_binary() {
        let dir = tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path().join("src"), dir.path().join("out"));

        let text = write_blob(&store, b"some text\n");
        let image = write_blob(&store, b"\x89PNG\r\n");

        let pre1950_dir = write_tree(
            &store,
            vec![
                TreeEntry { mode: MODE_FILE.to_string(), name: b"a.txt".to_vec(), hash: text },
                TreeEntry { mode: MODE_FILE.to_string(), name: b"a.png".to_vec(), hash: image },
            ],
        );
        let standard_dir = write_tree(
            &store,
            vec![TreeEntry {
                mode: MODE_DIR.to_string(),
                name: b"pre1950".to_vec(),
                hash: pre1950_dir,
            }],
        );
        let trunk = write_tree(
            &store,
            vec![TreeEntry { mode: MODE_DIR.to_string(), name: b"standard".to_vec(), hash: standard_dir }],
        );
        let root = write_tree(
            &store,
            vec![TreeEntry { mode: MODE_DIR.to_string(), name: b"trunk".to_vec(), hash: trunk }],
        );
        let top = write_tree(
            &store,
            vec![TreeEntry { mode: MODE_DIR.to_string(), name: b"ruscorpora".to_vec(), hash: root }],
        );

        let collected = CollectedCache::default();
        let result = collect_commit(&store, &collected, top).unwrap();

        assert!(result.contains_key(&text));
        assert!(!result.contains_key(&image));
        assert_eq!(result[&text], HashSet::from([RepoId::new("main")]));
    }
}
