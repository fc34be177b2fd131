use assert_cmd::Command;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use sha1::{Digest, Sha1};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn write_object(objects_root: &Path, kind: &str, payload: &[u8]) -> String {
    let header = format!("{kind} {}\0", payload.len());
    let mut hasher = Sha1::new();
    hasher.update(header.as_bytes());
    hasher.update(payload);
    let hex = hex::encode(hasher.finalize());

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(header.as_bytes()).unwrap();
    encoder.write_all(payload).unwrap();
    let compressed = encoder.finish().unwrap();

    let dir = objects_root.join(&hex[..2]);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(&hex[2..]), compressed).unwrap();
    hex
}

#[test]
fn run_splits_a_tiny_history_into_the_expected_output_repo() {
    let temp = TempDir::new().unwrap();
    let source_root = temp.path().join("source");
    let objects_root = source_root.join("objects");
    fs::create_dir_all(&objects_root).unwrap();

    let blob_hex = write_object(&objects_root, "blob", b"some standard text\n");
    let blob_bytes: Vec<u8> = hex::decode(&blob_hex).unwrap();
    let mut entry = Vec::new();
    entry.extend_from_slice(b"100644 a.txt\0");
    entry.extend_from_slice(&blob_bytes);

    let standard_dir_hex = write_object(&objects_root, "tree", &entry);
    let mut corpora_entry = Vec::new();
    corpora_entry.extend_from_slice(b"40000 standard\0");
    corpora_entry.extend_from_slice(&hex::decode(&standard_dir_hex).unwrap());

    let corpora_hex = write_object(&objects_root, "tree", &corpora_entry);
    let mut trunk_entry = Vec::new();
    trunk_entry.extend_from_slice(b"40000 corpora\0");
    trunk_entry.extend_from_slice(&hex::decode(&corpora_hex).unwrap());

    let trunk_hex = write_object(&objects_root, "tree", &trunk_entry);
    let mut root_entry = Vec::new();
    root_entry.extend_from_slice(b"40000 trunk\0");
    root_entry.extend_from_slice(&hex::decode(&trunk_hex).unwrap());

    let root_hex = write_object(&objects_root, "tree", &root_entry);
    let mut top_entry = Vec::new();
    top_entry.extend_from_slice(b"40000 ruscorpora\0");
    top_entry.extend_from_slice(&hex::decode(&root_hex).unwrap());

    let top_hex = write_object(&objects_root, "tree", &top_entry);

    let commit_payload = format!("tree {top_hex}\nauthor a <a@b> 0 +0000\n\ninitial\n");
    let commit_hex = write_object(&objects_root, "commit", commit_payload.as_bytes());

    let input_path = temp.path().join("input.txt");
    fs::write(&input_path, format!("commit {commit_hex}\n{top_hex}\n")).unwrap();

    let output_root = temp.path().join("out");

    Command::cargo_bin("histcarve")
        .unwrap()
        .arg("run")
        .arg("--input")
        .arg(&input_path)
        .arg("--source-root")
        .arg(&source_root)
        .arg("--output-root")
        .arg(&output_root)
        .assert()
        .success();

    assert!(output_root.join("shamap.txt").exists());
    assert!(output_root.join("main").join("objects").exists());
}
