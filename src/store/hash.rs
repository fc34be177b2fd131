use sha1::{Digest, Sha1};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A 20-byte content-addressed object identifier.
///
/// Equality is bytewise; the 40-character lowercase hex form is only a
/// display/parse convenience, never the canonical representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHash([u8; 20]);

#[derive(Debug, Error)]
pub enum HashParseError {
    #[error("object hash must be 40 hex characters, got {0}")]
    WrongLength(usize),
    #[error("object hash contains non-hex characters: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

impl ObjectHash {
    pub const LEN: usize = 20;

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First two hex characters, used as the shard directory name.
    pub fn shard_dir(&self) -> String {
        hex::encode(&self.0[..1])
    }

    /// Remaining 38 hex characters, used as the object file name.
    pub fn shard_file(&self) -> String {
        hex::encode(&self.0[1..])
    }
}

impl fmt::Display for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectHash({})", self.to_hex())
    }
}

impl FromStr for ObjectHash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 40 {
            return Err(HashParseError::WrongLength(s.len()));
        }
        let decoded = hex::decode(s)?;
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }
}

/// The three object kinds a loose object store ever sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
        }
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blob" => Ok(ObjectKind::Blob),
            "tree" => Ok(ObjectKind::Tree),
            "commit" => Ok(ObjectKind::Commit),
            other => Err(format!("unknown object kind: {other}")),
        }
    }
}

/// Computes the canonical content hash of `payload` under the given type,
/// i.e. `sha1("<type> <len>\0" + payload)`.
pub fn hash_of(kind: ObjectKind, payload: &[u8]) -> ObjectHash {
    let header = format!("{} {}\0", kind.as_str(), payload.len());
    let mut hasher = Sha1::new();
    hasher.update(header.as_bytes());
    hasher.update(payload);
    let digest = hasher.finalize();
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest);
    ObjectHash(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_of_blob_matches_reference_git_sha1() {
        // git hash-object for a blob containing "hello\n"
        let hash = hash_of(ObjectKind::Blob, b"hello\n");
        assert_eq!(hash.to_hex(), "ce013625030ba8dba906f756967f9e9ca394464a");
    }

    #[test]
    fn hash_of_empty_blob() {
        let hash = hash_of(ObjectKind::Blob, b"");
        assert_eq!(hash.to_hex(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    }

    #[test]
    fn display_and_parse_round_trip() {
        let hash = hash_of(ObjectKind::Blob, b"roundtrip");
        let text = hash.to_string();
        let parsed: ObjectHash = text.parse().unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!("abc".parse::<ObjectHash>().is_err());
    }

    #[test]
    fn shard_dir_and_file_split_at_one_byte() {
        let hash = hash_of(ObjectKind::Blob, b"hello\n");
        let hex = hash.to_hex();
        assert_eq!(hash.shard_dir(), hex[..2]);
        assert_eq!(hash.shard_file(), hex[2..]);
    }
}
