//! Parses the newline-delimited `commit <hex40>` / `<hex40>` record
//! stream that drives a run: each `commit` line is followed by the
//! root-tree hash of that commit.

use crate::store::hash::{HashParseError, ObjectHash};
use std::io::{BufRead, BufReader, Read};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("line {0}: {1}")]
    BadLine(usize, &'static str),
    #[error("line {0}: invalid hash: {1}")]
    BadHash(usize, #[source] HashParseError),
    #[error("commit count ({commits}) does not match tree count ({trees})")]
    CountMismatch { commits: usize, trees: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct InputRecord {
    pub commit: ObjectHash,
    pub tree: ObjectHash,
}

#[derive(Debug, Default)]
pub struct ParsedInput {
    pub records: Vec<InputRecord>,
}

/// Parses `reader` as the record stream. A `commit <hex40>` line is
/// always immediately followed by its tree's `<hex40>` line; any other
/// pairing is a structural error.
pub fn parse<R: Read>(reader: R) -> Result<ParsedInput, InputError> {
    let reader = BufReader::new(reader);
    let mut records = Vec::new();
    let mut pending_commit: Option<ObjectHash> = None;
    let mut commit_lines = 0usize;
    let mut tree_lines = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let lineno = idx + 1;
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        if let Some(hex) = line.strip_prefix("commit ") {
            if pending_commit.is_some() {
                return Err(InputError::BadLine(lineno, "commit line with no preceding tree line"));
            }
            let hash: ObjectHash = hex.parse().map_err(|e| InputError::BadHash(lineno, e))?;
            pending_commit = Some(hash);
            commit_lines += 1;
        } else {
            let tree: ObjectHash = line.parse().map_err(|e| InputError::BadHash(lineno, e))?;
            let Some(commit) = pending_commit.take() else {
                return Err(InputError::BadLine(lineno, "tree line with no preceding commit line"));
            };
            records.push(InputRecord { commit, tree });
            tree_lines += 1;
        }
    }

    if pending_commit.is_some() {
        return Err(InputError::BadLine(commit_lines, "trailing commit line with no tree line"));
    }

    if commit_lines != tree_lines {
        return Err(InputError::CountMismatch { commits: commit_lines, trees: tree_lines });
    }

    Ok(ParsedInput { records })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_alternating_commit_and_tree_lines() {
        let commit = "a".repeat(40);
        let tree = "b".repeat(40);
        let text = format!("commit {commit}\n{tree}\n");
        let parsed = parse(text.as_bytes()).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].commit.to_hex(), commit);
        assert_eq!(parsed.records[0].tree.to_hex(), tree);
    }

    #[test]
    fn rejects_two_consecutive_commit_lines() {
        let text = format!("commit {}\ncommit {}\n", "a".repeat(40), "b".repeat(40));
        assert!(matches!(parse(text.as_bytes()), Err(InputError::BadLine(_, _))));
    }

    #[test]
    fn rejects_tree_line_without_commit() {
        let text = format!("{}\n", "a".repeat(40));
        assert!(matches!(parse(text.as_bytes()), Err(InputError::BadLine(_, _))));
    }

    #[test]
    fn blank_lines_are_ignored() {
        let commit = "a".repeat(40);
        let tree = "b".repeat(40);
        let text = format!("\ncommit {commit}\n\n{tree}\n\n");
        let parsed = parse(text.as_bytes()).unwrap();
        assert_eq!(parsed.records.len(), 1);
    }
}
