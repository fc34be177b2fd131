//! Commit Rewriter: a single-threaded, per-output-repo linear walk that
//! emits new commits with rewritten tree pointers and parent chains,
//! skipping commits that contributed no content and no-op squashing
//! consecutive commits whose translated root didn't change.

use crate::input::ParsedInput;
use crate::mapping::RepoId;
use crate::pipeline::{RepoSummary, RunSummary};
use crate::store::codec::{decode_commit_header, CodecError};
use crate::store::hash::{hash_of, ObjectHash, ObjectKind};
use crate::store::loose::{LooseObjectStore, RepoScope, StoreError};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommitRewriteError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub fn rewrite_commits(
    store: &LooseObjectStore,
    input: &ParsedInput,
    root_trees: &HashMap<(ObjectHash, RepoId), ObjectHash>,
) -> Result<HashMap<RepoId, RepoSummary>, CommitRewriteError> {
    let repos: std::collections::HashSet<RepoId> =
        root_trees.keys().map(|(_, repo)| repo.clone()).collect();

    let mut summaries = HashMap::new();

    for repo in repos {
        if let Some(summary) = rewrite_one_repo(store, input, root_trees, &repo)? {
            summaries.insert(repo, summary);
        }
    }

    Ok(summaries)
}

fn rewrite_one_repo(
    store: &LooseObjectStore,
    input: &ParsedInput,
    root_trees: &HashMap<(ObjectHash, RepoId), ObjectHash>,
    repo: &RepoId,
) -> Result<Option<RepoSummary>, CommitRewriteError> {
    let scope = RepoScope::Output(repo.clone());

    let mut prev_new_commit: Option<ObjectHash> = None;
    let mut prev_root: Option<ObjectHash> = None;
    let mut commits_emitted = 0usize;

    for record in &input.records {
        let Some(&new_root) = root_trees.get(&(record.tree, repo.clone())) else {
            continue;
        };
        if Some(new_root) == prev_root {
            continue;
        }

        let (_, _, source_payload) = store.read(&record.commit, &RepoScope::Source)?;
        let header = decode_commit_header(&source_payload)?;

        let mut payload = format!("tree {}\n", new_root.to_hex()).into_bytes();
        if let Some(parent) = prev_new_commit {
            payload.extend_from_slice(format!("parent {}\n", parent.to_hex()).as_bytes());
        }
        payload.extend_from_slice(&header.rest);

        let new_hash = hash_of(ObjectKind::Commit, &payload);
        store.write(ObjectKind::Commit, &payload, &scope)?;

        prev_new_commit = Some(new_hash);
        prev_root = Some(new_root);
        commits_emitted += 1;
    }

    Ok(prev_new_commit.map(|final_commit| RepoSummary { final_commit, commits_emitted }))
}

impl RunSummary {
    pub fn print_terminal_summary(&self) {
        for (repo, summary) in &self.repos {
            println!(
                "{repo}: {} commits, final {}",
                summary.commits_emitted,
                summary.final_commit
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputRecord;
    use crate::store::codec::{encode_tree, TreeEntry, MODE_FILE};
    use tempfile::tempdir;

    fn commit_payload(tree: ObjectHash, parent: Option<ObjectHash>, rest: &str) -> Vec<u8> {
        let mut out = format!("tree {}\n", tree.to_hex()).into_bytes();
        if let Some(p) = parent {
            out.extend_from_slice(format!("parent {}\n", p.to_hex()).as_bytes());
        }
        out.extend_from_slice(rest.as_bytes());
        out
    }

    #[test]
    fn no_op_commits_are_squashed() {
        let dir = tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path().join("src"), dir.path().join("out"));
        let repo = RepoId::new("main");

        let blob = store.write(ObjectKind::Blob, b"hi\n", &RepoScope::Source).unwrap();
        let tree_entries = vec![TreeEntry { mode: MODE_FILE.to_string(), name: b"a".to_vec(), hash: blob }];
        let tree_hash = store
            .write(ObjectKind::Tree, &encode_tree(&tree_entries).unwrap(), &RepoScope::Source)
            .unwrap();

        let c1_payload = commit_payload(tree_hash, None, "author a 0\n\nmsg1\n");
        let c1 = store.write(ObjectKind::Commit, &c1_payload, &RepoScope::Source).unwrap();

        let c2_payload = commit_payload(tree_hash, Some(c1), "author a 0\n\nmsg2\n");
        let c2 = store.write(ObjectKind::Commit, &c2_payload, &RepoScope::Source).unwrap();

        let input = ParsedInput {
            records: vec![
                InputRecord { commit: c1, tree: tree_hash },
                InputRecord { commit: c2, tree: tree_hash },
            ],
        };

        let new_root = store
            .write(ObjectKind::Tree, &encode_tree(&tree_entries).unwrap(), &RepoScope::Output(repo.clone()))
            .unwrap();
        let mut root_trees = HashMap::new();
        root_trees.insert((tree_hash, repo.clone()), new_root);

        let summary = rewrite_one_repo(&store, &input, &root_trees, &repo).unwrap().unwrap();
        assert_eq!(summary.commits_emitted, 1);
    }
}
