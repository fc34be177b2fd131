//! Reads and writes compressed loose objects, sharded by the first byte
//! of the hex hash, centralizing the read/write/path-sharding logic that
//! would otherwise be reimplemented ad hoc per object kind.

use crate::mapping::RepoId;
use crate::store::hash::{hash_of, ObjectHash, ObjectKind};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object {0} not found under {1}")]
    ObjectMissing(ObjectHash, PathBuf),
    #[error("malformed object at {0}: {1}")]
    MalformedObject(PathBuf, &'static str),
    #[error("io error at {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
}

/// Which object-root a read/write targets: the shared source store, or
/// one specific output repo's store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RepoScope {
    Source,
    Output(RepoId),
}

/// A loose object store rooted at a directory containing one `objects/`
/// tree per scope (the source root itself, or `<root>/<repo>/objects`
/// for each output repo).
pub struct LooseObjectStore {
    source_root: PathBuf,
    output_root: PathBuf,
}

impl LooseObjectStore {
    pub fn new(source_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            output_root: output_root.into(),
        }
    }

    fn objects_dir(&self, scope: &RepoScope) -> PathBuf {
        match scope {
            RepoScope::Source => self.source_root.join("objects"),
            RepoScope::Output(repo) => self.output_root.join(repo.as_str()).join("objects"),
        }
    }

    fn object_path(&self, scope: &RepoScope, hash: &ObjectHash) -> PathBuf {
        self.objects_dir(scope)
            .join(hash.shard_dir())
            .join(hash.shard_file())
    }

    /// Reads and decompresses the object at `hash` within `scope`.
    pub fn read(
        &self,
        hash: &ObjectHash,
        scope: &RepoScope,
    ) -> Result<(ObjectKind, usize, Vec<u8>), StoreError> {
        let path = self.object_path(scope, hash);
        let compressed = fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::ObjectMissing(*hash, path.clone())
            } else {
                StoreError::Io(path.clone(), e)
            }
        })?;

        let mut decoder = ZlibDecoder::new(&compressed[..]);
        let mut data = Vec::new();
        decoder
            .read_to_end(&mut data)
            .map_err(|e| StoreError::Io(path.clone(), e))?;

        let nul = data
            .iter()
            .position(|&b| b == 0)
            .ok_or(StoreError::MalformedObject(path.clone(), "missing header NUL"))?;
        let header = std::str::from_utf8(&data[..nul])
            .map_err(|_| StoreError::MalformedObject(path.clone(), "header is not utf-8"))?;
        let (kind_str, len_str) = header
            .split_once(' ')
            .ok_or(StoreError::MalformedObject(path.clone(), "header missing space"))?;
        let kind = ObjectKind::from_str(kind_str)
            .map_err(|_| StoreError::MalformedObject(path.clone(), "unknown object kind"))?;
        let len: usize = len_str
            .parse()
            .map_err(|_| StoreError::MalformedObject(path.clone(), "non-numeric length"))?;

        let payload = data[nul + 1..].to_vec();
        if payload.len() != len {
            return Err(StoreError::MalformedObject(path, "length mismatch"));
        }

        Ok((kind, len, payload))
    }

    /// Writes `payload` of kind `kind` into `scope`, returning its hash.
    /// Writing an object that already exists on disk is a no-op.
    pub fn write(
        &self,
        kind: ObjectKind,
        payload: &[u8],
        scope: &RepoScope,
    ) -> Result<ObjectHash, StoreError> {
        let hash = hash_of(kind, payload);
        let path = self.object_path(scope, &hash);

        if path.exists() {
            return Ok(hash);
        }

        let dir = path.parent().expect("object path always has a parent");
        fs::create_dir_all(dir).map_err(|e| StoreError::Io(dir.to_path_buf(), e))?;

        let header = format!("{} {}\0", kind.as_str(), payload.len());
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(header.as_bytes())
            .map_err(|e| StoreError::Io(path.clone(), e))?;
        encoder
            .write_all(payload)
            .map_err(|e| StoreError::Io(path.clone(), e))?;
        let compressed = encoder
            .finish()
            .map_err(|e| StoreError::Io(path.clone(), e))?;

        // Write-to-temp-then-rename so a concurrent reader never observes
        // a partially written object: two workers racing to write the
        // same hash both succeed and agree on content by construction.
        let tmp_path = path.with_extension(format!("tmp-{}", std::process::id()));
        fs::write(&tmp_path, &compressed).map_err(|e| StoreError::Io(tmp_path.clone(), e))?;
        match fs::rename(&tmp_path, &path) {
            Ok(()) => {}
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                if !path.exists() {
                    return Err(StoreError::Io(path, e));
                }
            }
        }

        Ok(hash)
    }

    pub fn exists(&self, hash: &ObjectHash, scope: &RepoScope) -> bool {
        self.object_path(scope, hash).exists()
    }

    pub fn source_objects_root(&self) -> &Path {
        &self.source_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path().join("src"), dir.path().join("out"));

        let hash = store
            .write(ObjectKind::Blob, b"hello\n", &RepoScope::Source)
            .unwrap();
        let (kind, len, payload) = store.read(&hash, &RepoScope::Source).unwrap();

        assert_eq!(kind, ObjectKind::Blob);
        assert_eq!(len, 6);
        assert_eq!(payload, b"hello\n");
    }

    #[test]
    fn write_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path().join("src"), dir.path().join("out"));

        let h1 = store
            .write(ObjectKind::Blob, b"same content", &RepoScope::Source)
            .unwrap();
        let h2 = store
            .write(ObjectKind::Blob, b"same content", &RepoScope::Source)
            .unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn read_missing_object_fails() {
        let dir = tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path().join("src"), dir.path().join("out"));
        let hash = hash_of(ObjectKind::Blob, b"never written");
        assert!(matches!(
            store.read(&hash, &RepoScope::Source),
            Err(StoreError::ObjectMissing(_, _))
        ));
    }

    #[test]
    fn output_scope_writes_under_repo_subdirectory() {
        let dir = tempdir().unwrap();
        let store = LooseObjectStore::new(dir.path().join("src"), dir.path().join("out"));
        let repo = RepoId::new("main");

        let hash = store
            .write(ObjectKind::Blob, b"payload", &RepoScope::Output(repo.clone()))
            .unwrap();

        let expected = dir
            .path()
            .join("out")
            .join("main")
            .join("objects")
            .join(hash.shard_dir())
            .join(hash.shard_file());
        assert!(expected.exists());
    }
}
