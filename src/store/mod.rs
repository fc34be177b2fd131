pub mod codec;
pub mod hash;
pub mod loose;

pub use codec::{decode_commit_header, decode_tree, encode_tree, CodecError, CommitHeader, TreeEntry};
pub use hash::{hash_of, HashParseError, ObjectHash, ObjectKind};
pub use loose::{LooseObjectStore, RepoScope, StoreError};
