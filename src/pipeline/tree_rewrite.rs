//! Tree Rewriter: translates one source root tree into a `{output-repo ->
//! new-root-hash}` map, applying the mapping table above the splitting
//! fringe and a plain copy-with-transcode walk below it.

use crate::mapping::{self, rewrite_extension, MappingDecision, RepoId};
use crate::pipeline::cache::SharedCache;
use crate::pipeline::split_tree::{MaterializeError, SplitTree};
use crate::pipeline::{extension_of, BIN_EXTS, KILL_EXTS};
use crate::store::codec::{decode_tree, encode_tree, CodecError, TreeEntry, MODE_DIR};
use crate::store::hash::{ObjectHash, ObjectKind};
use crate::store::loose::{LooseObjectStore, RepoScope, StoreError};
use log::warn;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Materialize(#[from] MaterializeError),
}

/// `(repo, source-tree-hash) -> translated-tree-hash`, populated only
/// below the splitting fringe (depth > 5).
pub type TreeCache = SharedCache<(RepoId, ObjectHash), ObjectHash>;

/// `(repo, source-blob-hash) -> translated-blob-hash`, populated by the
/// transcode phase.
pub type FileCache = SharedCache<(RepoId, ObjectHash), ObjectHash>;

const TREE_CACHE_DEPTH_GATE: u32 = 5;

pub struct RewriteContext<'a> {
    pub store: &'a LooseObjectStore,
    pub tree_cache: &'a TreeCache,
    pub file_cache: &'a FileCache,
}

/// Translates `source_root` into one root tree per output repo reached.
pub fn rewrite_root(
    ctx: &RewriteContext,
    source_root: ObjectHash,
) -> Result<HashMap<RepoId, ObjectHash>, RewriteError> {
    let mut split = SplitTree::new();
    scan(ctx, source_root, 0, "", &mut split)?;
    Ok(split.materialize_all(ctx.store)?)
}

/// The above-the-fringe walk: every entry still goes through `map()`.
fn scan(
    ctx: &RewriteContext,
    hash: ObjectHash,
    depth: u32,
    parent_path: &str,
    split: &mut SplitTree,
) -> Result<(), RewriteError> {
    let (_, _, payload) = ctx.store.read(&hash, &RepoScope::Source)?;
    let entries = decode_tree(&payload)?;

    for entry in entries {
        let child_path = format!("{parent_path}/{}", entry.name_str_lossy());

        match mapping::map(depth, &entry.name, parent_path) {
            MappingDecision::Drop => {}
            MappingDecision::Descend => {
                if entry.is_dir() {
                    scan(ctx, entry.hash, depth + 1, &child_path, split)?;
                } else {
                    warn!("map() returned Descend for a file at {child_path}, dropping");
                }
            }
            MappingDecision::Remap { repo, subpath, rename } => {
                place_remap(ctx, &entry, depth, &child_path, &repo, &subpath, rename.as_deref(), split)?;
            }
            MappingDecision::PassThrough => {
                warn!("unexpected PassThrough from map() at {child_path}, dropping");
            }
        }
    }
    Ok(())
}

fn split_subpath(subpath: &str) -> Vec<Vec<u8>> {
    if subpath == "/" {
        return Vec::new();
    }
    subpath.split('/').filter(|s| !s.is_empty()).map(|s| s.as_bytes().to_vec()).collect()
}

fn place_remap(
    ctx: &RewriteContext,
    entry: &TreeEntry,
    depth: u32,
    path: &str,
    repo: &RepoId,
    subpath: &str,
    rename: Option<&str>,
    split: &mut SplitTree,
) -> Result<(), RewriteError> {
    if subpath.is_empty() {
        // Empty (non-`/`) subpath means descend in place through the
        // mapping table rather than mount here: the repo name carried by
        // this decision is discarded, matching a plain `Descend`.
        if entry.is_dir() {
            scan(ctx, entry.hash, depth + 1, path, split)?;
        } else {
            warn!("empty-subpath remap for a file at {path}, dropping");
        }
        return Ok(());
    }

    let components = split_subpath(subpath);

    if entry.is_dir() {
        let mounted = mount(ctx, repo, entry.hash, depth + 1, path)?;
        if components.is_empty() {
            split.set_root_hash(repo, mounted);
        } else {
            let (dirs, last) = components.split_at(components.len() - 1);
            let dir_refs: Vec<&[u8]> = dirs.iter().map(|c| c.as_slice()).collect();
            let node = split.ensure_path(repo, &dir_refs);
            SplitTree::add_dir_at(node, &last[0], path, Some(mounted));
        }
        return Ok(());
    }

    let final_name = rename
        .map(|r| r.as_bytes().to_vec())
        .or_else(|| rewrite_extension(&entry.name));
    let Some(final_name) = final_name else {
        return Ok(()); // trailing `.!`: dropped
    };

    let translated = ctx.file_cache.get(&(repo.clone(), entry.hash)).unwrap_or_else(|| {
        warn!("no transcoded copy cached for {:?} in {repo}, using original", entry.name_str_lossy());
        entry.hash
    });

    let dir_refs: Vec<&[u8]> = components.iter().map(|c| c.as_slice()).collect();
    let node = split.ensure_path(repo, &dir_refs);
    SplitTree::append(node, &entry.mode, &final_name, translated, path);
    Ok(())
}

/// The below-the-fringe walk entered once an entire directory has
/// remapped into `repo`: every descendant is copied as-is (binary/killed
/// extensions), through the file cache (ordinary text), or recursed into
/// (directories) — no further `map()` calls.
fn mount(
    ctx: &RewriteContext,
    repo: &RepoId,
    hash: ObjectHash,
    depth: u32,
    parent_path: &str,
) -> Result<ObjectHash, RewriteError> {
    if depth > TREE_CACHE_DEPTH_GATE {
        if let Some(cached) = ctx.tree_cache.get(&(repo.clone(), hash)) {
            return Ok(cached);
        }
    }

    let (_, _, payload) = ctx.store.read(&hash, &RepoScope::Source)?;
    let entries = decode_tree(&payload)?;

    let mut out_entries = Vec::with_capacity(entries.len());
    for entry in entries {
        let child_path = format!("{parent_path}/{}", entry.name_str_lossy());

        if entry.is_dir() {
            let child_hash = mount(ctx, repo, entry.hash, depth + 1, &child_path)?;
            out_entries.push(TreeEntry { mode: MODE_DIR.to_string(), name: entry.name, hash: child_hash });
            continue;
        }

        if entry.name == b".gitignore" {
            let (kind, _, payload) = ctx.store.read(&entry.hash, &RepoScope::Source)?;
            let rewritten = ctx.store.write(kind, &payload, &RepoScope::Output(repo.clone()))?;
            out_entries.push(TreeEntry { mode: entry.mode.clone(), name: entry.name, hash: rewritten });
            continue;
        }

        let ext = extension_of(&entry.name);
        if KILL_EXTS.contains(ext.as_str()) {
            continue;
        }
        if BIN_EXTS.contains(ext.as_str()) {
            let (kind, _, payload) = ctx.store.read(&entry.hash, &RepoScope::Source)?;
            let rewritten = ctx.store.write(kind, &payload, &RepoScope::Output(repo.clone()))?;
            out_entries.push(TreeEntry { mode: entry.mode.clone(), name: entry.name, hash: rewritten });
            continue;
        }

        let Some(final_name) = rewrite_extension(&entry.name) else {
            continue;
        };
        let translated = ctx.file_cache.get(&(repo.clone(), entry.hash)).unwrap_or_else(|| {
            warn!("no transcoded copy cached for {:?} in {repo}, using original", entry.name_str_lossy());
            entry.hash
        });
        out_entries.push(TreeEntry { mode: entry.mode.clone(), name: final_name, hash: translated });
    }

    let payload = encode_tree(&out_entries)?;
    let new_hash = ctx.store.write(ObjectKind::Tree, &payload, &RepoScope::Output(repo.clone()))?;

    if depth > TREE_CACHE_DEPTH_GATE {
        ctx.tree_cache.set_if_absent((repo.clone(), hash), new_hash);
    }

    Ok(new_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::codec::MODE_FILE;
    use tempfile::tempdir;

    fn write_blob(store: &LooseObjectStore, content: &[u8]) -> ObjectHash {
        store.write(ObjectKind::Blob, content, &RepoScope::Source).unwrap()
    }

    fn write_tree(store: &LooseObjectStore, entries: Vec<TreeEntry>) -> ObjectHash {
        let payload = encode_tree(&entries).unwrap();
        store.write(ObjectKind::Tree, &payload, &RepoScope::Source).unwrap()
    }

    #[test]
    fn depth_two_split_produces_two_output_repos() {
        let dir = tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path().join("src"), dir.path().join("out"));

        let spoken_blob = write_blob(&store, b"spoken text\n");
        let standard_blob = write_blob(&store, b"standard text\n");

        let spoken_manual_dir = write_tree(
            &store,
            vec![TreeEntry { mode: MODE_FILE.to_string(), name: b"a.txt".to_vec(), hash: spoken_blob }],
        );
        let spoken_dir = write_tree(
            &store,
            vec![TreeEntry { mode: MODE_DIR.to_string(), name: b"manual".to_vec(), hash: spoken_manual_dir }],
        );
        let standard_pre1950_dir = write_tree(
            &store,
            vec![TreeEntry { mode: MODE_FILE.to_string(), name: b"b.txt".to_vec(), hash: standard_blob }],
        );
        let standard_dir = write_tree(
            &store,
            vec![TreeEntry {
                mode: MODE_DIR.to_string(),
                name: b"pre1950".to_vec(),
                hash: standard_pre1950_dir,
            }],
        );
        let trunk = write_tree(
            &store,
            vec![
                TreeEntry { mode: MODE_DIR.to_string(), name: b"spoken".to_vec(), hash: spoken_dir },
                TreeEntry { mode: MODE_DIR.to_string(), name: b"standard".to_vec(), hash: standard_dir },
            ],
        );
        let root = write_tree(
            &store,
            vec![TreeEntry { mode: MODE_DIR.to_string(), name: b"trunk".to_vec(), hash: trunk }],
        );
        let top = write_tree(
            &store,
            vec![TreeEntry { mode: MODE_DIR.to_string(), name: b"ruscorpora".to_vec(), hash: root }],
        );

        let tree_cache = TreeCache::default();
        let file_cache = FileCache::default();
        file_cache.set_if_absent((RepoId::new("spoken"), spoken_blob), spoken_blob);
        file_cache.set_if_absent((RepoId::new("main"), standard_blob), standard_blob);

        let ctx = RewriteContext { store: &store, tree_cache: &tree_cache, file_cache: &file_cache };
        let roots = rewrite_root(&ctx, top).unwrap();

        assert!(roots.contains_key(&RepoId::new("spoken")));
        assert!(roots.contains_key(&RepoId::new("main")));
    }

    #[test]
    fn rename_rule_applies_on_remap() {
        let dir = tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path().join("src"), dir.path().join("out"));

        let blob = write_blob(&store, b"csv data\n");
        let standard_dir = write_tree(
            &store,
            vec![TreeEntry {
                mode: MODE_FILE.to_string(),
                name: b"standard_1.csv".to_vec(),
                hash: blob,
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

        let tree_cache = TreeCache::default();
        let file_cache = FileCache::default();
        file_cache.set_if_absent((RepoId::new("main"), blob), blob);

        let ctx = RewriteContext { store: &store, tree_cache: &tree_cache, file_cache: &file_cache };
        let roots = rewrite_root(&ctx, top).unwrap();
        let main_root = roots[&RepoId::new("main")];

        let (_, _, payload) = store.read(&main_root, &RepoScope::Output(RepoId::new("main"))).unwrap();
        let entries = decode_tree(&payload).unwrap();
        // main/standard/tables/standard.csv
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, b"standard");
    }
}
