//! The pipeline coordinator: owns the worker pools, the shared caches,
//! and the hard stage barriers (Collect → Transcode → Rewrite-Trees →
//! Rewrite-Commits) described in the concurrency model.

pub mod cache;
pub mod collect;
pub mod commit_rewrite;
pub mod split_tree;
pub mod tree_rewrite;

use crate::config::Config;
use crate::encoding::{convert_payload, EncodingError};
use crate::input::{InputRecord, ParsedInput};
use crate::mapping::RepoId;
use crate::store::hash::ObjectHash;
use crate::store::loose::{LooseObjectStore, RepoScope, StoreError};
use cache::SharedCache;
use collect::{collect_commit, CollectedCache};
use commit_rewrite::{rewrite_commits, CommitRewriteError};
use indicatif::{ProgressBar, ProgressStyle};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use rayon::ThreadPoolBuilder;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tree_rewrite::{rewrite_root, FileCache, RewriteContext, RewriteError, TreeCache};

lazy_static! {
    /// Extensions passed through unchanged and excluded from collection.
    pub static ref BIN_EXTS: HashSet<&'static str> = [
        ".aif", ".bin", ".bmp", ".cur", ".gif", ".icm", ".ico", ".jpeg", ".jpg", ".m4a", ".m4v",
        ".mov", ".mp3", ".mp4", ".mpg", ".oga", ".ogg", ".ogv", ".otf", ".pdf", ".png", ".sitx",
        ".swf", ".tiff", ".ttf", ".wav", ".webm", ".webp", ".woff", ".woff2", ".zip", ".eot",
        ".marisa", ".xls", ".xlsx", ".psd",
    ]
    .into_iter()
    .collect();

    /// Extensions whose files are dropped entirely.
    pub static ref KILL_EXTS: HashSet<&'static str> = [".msi"].into_iter().collect();
}

/// The lowercased extension of `name` (including the leading dot), or an
/// empty string if there is none, matching `os.path.splitext(...).lower()`.
pub fn extension_of(name: &[u8]) -> String {
    let name = String::from_utf8_lossy(name);
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[idx..].to_lowercase(),
        _ => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Collect(#[from] collect::CollectError),
    #[error(transparent)]
    Rewrite(#[from] RewriteError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    CommitRewrite(#[from] CommitRewriteError),
    #[error("worker pool panicked: {0}")]
    WorkerFailure(String),
    #[error("failed to write shamap.txt: {0}")]
    ShamapIo(#[source] std::io::Error),
}

/// Per-output-repo result of a full run: the final commit hash and a few
/// counters used for the terminal summary.
#[derive(Debug, Clone)]
pub struct RepoSummary {
    pub final_commit: ObjectHash,
    pub commits_emitted: usize,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub repos: HashMap<RepoId, RepoSummary>,
    pub commits_considered: usize,
    pub blobs_transcoded: usize,
}

/// Runs the full Collect → Transcode → Rewrite-Trees → Rewrite-Commits
/// pipeline over `input` and writes results into `config.output_object_root`.
pub fn run(config: &Config, input: &ParsedInput) -> Result<RunSummary, PipelineError> {
    let store = LooseObjectStore::new(&config.source_object_root, &config.output_object_root);
    let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);

    let records: &[InputRecord] = match config.max_commits {
        Some(limit) if limit < input.records.len() => {
            info!("bounding run to the first {limit} of {} commits", input.records.len());
            &input.records[..limit]
        }
        _ => &input.records,
    };

    let roots: Vec<ObjectHash> = records.iter().map(|r| r.tree).collect();

    // --- Stage 1: Collect ---------------------------------------------
    info!("collection: {} commits, pool width {}", roots.len(), (8usize).min(2 * cpus));
    let collected = CollectedCache::default();
    let collect_pool = ThreadPoolBuilder::new()
        .num_threads((8usize).min(2 * cpus))
        .build()
        .map_err(|e| PipelineError::WorkerFailure(e.to_string()))?;

    let collected_maps: Vec<HashMap<ObjectHash, HashSet<RepoId>>> = collect_pool.install(|| {
        use rayon::prelude::*;
        roots
            .par_iter()
            .map(|&root| collect_commit(&store, &collected, root))
            .collect::<Result<Vec<_>, _>>()
    })?;

    let mut merged: HashMap<ObjectHash, HashSet<RepoId>> = HashMap::new();
    for map in collected_maps {
        for (hash, repos) in map {
            merged.entry(hash).or_default().extend(repos);
        }
    }
    debug!("collected {} distinct blobs", merged.len());

    // --- Stage 2: Transcode ---------------------------------------------
    let file_cache: FileCache = SharedCache::default();
    let transcode_pool = ThreadPoolBuilder::new()
        .num_threads((32usize).min(2 * cpus))
        .build()
        .map_err(|e| PipelineError::WorkerFailure(e.to_string()))?;

    let mut jobs: Vec<(ObjectHash, HashSet<RepoId>)> = merged.into_iter().collect();
    jobs.sort_by_key(|(hash, _)| hash.to_hex());

    let pb = ProgressBar::new(jobs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {percent}% • {pos}/{len} blobs {msg}")
            .unwrap()
            .progress_chars("▰▰▱"),
    );

    let blobs_transcoded = jobs.len();
    let mut shamap_rows: Vec<ShamapRow> = transcode_pool
        .install(|| {
            use rayon::prelude::*;
            jobs.par_iter()
                .map(|(hash, repos)| {
                    let rows = transcode_one(&store, &file_cache, *hash, repos);
                    pb.inc(1);
                    rows
                })
                .collect::<Result<Vec<_>, _>>()
        })?
        .into_iter()
        .flatten()
        .collect();
    pb.finish_and_clear();
    shamap_rows.sort_by(|a, b| (&a.orig_hex, &a.target_repo).cmp(&(&b.orig_hex, &b.target_repo)));

    write_shamap(&config.output_object_root, &shamap_rows).map_err(PipelineError::ShamapIo)?;

    // --- Stage 3: Rewrite-Trees ------------------------------------------
    let tree_cache: TreeCache = SharedCache::default();
    let tree_pool = ThreadPoolBuilder::new()
        .num_threads((4usize).min(2 * cpus))
        .build()
        .map_err(|e| PipelineError::WorkerFailure(e.to_string()))?;

    let rewrite_ctx = RewriteContext { store: &store, tree_cache: &tree_cache, file_cache: &file_cache };
    let per_commit_roots: Vec<HashMap<RepoId, ObjectHash>> = tree_pool.install(|| {
        use rayon::prelude::*;
        roots
            .par_iter()
            .map(|&root| rewrite_root(&rewrite_ctx, root))
            .collect::<Result<Vec<_>, _>>()
    })?;

    let mut root_trees: HashMap<(ObjectHash, RepoId), ObjectHash> = HashMap::new();
    for (&source_root, translated) in roots.iter().zip(per_commit_roots.iter()) {
        for (repo, hash) in translated {
            root_trees.insert((source_root, repo.clone()), *hash);
        }
    }

    // --- Stage 4: Rewrite-Commits (single-threaded) -----------------------
    let bounded_input = ParsedInput { records: records.to_vec() };
    let repo_summaries = rewrite_commits(&store, &bounded_input, &root_trees)?;

    for (repo, count) in &repo_summaries {
        if count.commits_emitted == 0 {
            warn!("repo {repo} received no content from this run");
        }
    }

    Ok(RunSummary {
        repos: repo_summaries,
        commits_considered: records.len(),
        blobs_transcoded,
    })
}

struct ShamapRow {
    orig_hex: String,
    count_targets: usize,
    target_repo: String,
    new_hex: Option<String>,
}

fn transcode_one(
    store: &LooseObjectStore,
    file_cache: &FileCache,
    hash: ObjectHash,
    repos: &HashSet<RepoId>,
) -> Result<Vec<ShamapRow>, PipelineError> {
    let (kind, _, payload) = store.read(&hash, &RepoScope::Source)?;
    let (_, converted) = convert_payload(&payload)?;

    let mut targets: Vec<&RepoId> = repos.iter().collect();
    targets.sort();

    let mut rows = Vec::with_capacity(targets.len());
    for repo in targets {
        let new_hash = store.write(kind, &converted, &RepoScope::Output(repo.clone()))?;
        file_cache.set_if_absent((repo.clone(), hash), new_hash);
        rows.push(ShamapRow {
            orig_hex: hash.to_hex(),
            count_targets: repos.len(),
            target_repo: repo.as_str().to_string(),
            new_hex: Some(new_hash.to_hex()),
        });
    }
    Ok(rows)
}

fn write_shamap(output_root: &Path, rows: &[ShamapRow]) -> std::io::Result<()> {
    std::fs::create_dir_all(output_root)?;
    let path = output_root.join("shamap.txt");
    let mut file = std::fs::File::create(path)?;
    for row in rows {
        writeln!(
            file,
            "{} {} {} {}",
            row.orig_hex,
            row.count_targets,
            row.target_repo,
            row.new_hex.as_deref().unwrap_or("none")
        )?;
    }
    Ok(())
}
