use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn blockdelta() -> Command {
    let mut command = Command::cargo_bin("blockdelta").expect("blockdelta binary");
    command.env_remove("BLOCKDELTA_LOG");
    command
}

fn noise(len: usize, mut state: u64) -> Vec<u8> {
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

struct Fixture {
    dir: TempDir,
    base: Vec<u8>,
    target: Vec<u8>,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = noise(64 * 1024, 0x5eed);
        let mut target = base[..20_000].to_vec();
        target.extend_from_slice(b"a fresh run of literal bytes");
        target.extend_from_slice(&base[30_000..]);
        fs::write(dir.path().join("base"), &base).expect("write base");
        fs::write(dir.path().join("target"), &target).expect("write target");
        Self { dir, base, target }
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }
}

#[test]
fn help_lists_usage() {
    blockdelta()
        .arg("--help")
        .assert()
        .success()
        .stderr(predicate::str::is_empty())
        .stdout(predicate::str::contains("Usage:").and(predicate::str::contains("blockdelta")));
}

#[test]
fn without_operands_shows_usage() {
    blockdelta()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn signature_prints_summary() {
    let fixture = Fixture::new();
    blockdelta()
        .args(["signature", "--block-size", "4K"])
        .arg(fixture.path("base"))
        .assert()
        .success()
        .stdout(
            predicate::str::contains("base length: 65536 bytes")
                .and(predicate::str::contains("blocks:      16"))
                .and(predicate::str::contains("weak:        adler32")),
        );
}

#[test]
fn signature_json_lists_every_block() {
    let fixture = Fixture::new();
    let output = blockdelta()
        .args(["signature", "--json", "-B", "8K", "--strong", "xxh64"])
        .arg(fixture.path("base"))
        .output()
        .expect("run blockdelta");
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(report["block_count"], 8);
    assert_eq!(report["base_len"], fixture.base.len());
    let blocks = report["blocks"].as_array().expect("blocks array");
    assert_eq!(blocks.len(), 8);
    assert_eq!(blocks[1]["offset"], 8192);
}

#[test]
fn delta_and_patch_round_trip() {
    let fixture = Fixture::new();
    let delta = fixture.path("delta");
    let rebuilt = fixture.path("rebuilt");

    blockdelta()
        .args(["delta", "-B", "1K", "-o"])
        .arg(&delta)
        .arg(fixture.path("base"))
        .arg(fixture.path("target"))
        .assert()
        .success();

    let encoded = fs::read(&delta).expect("read delta");
    assert!(encoded.starts_with(b"BDLT"));
    assert!(encoded.len() < fixture.target.len() / 4);

    blockdelta()
        .args(["patch", "-o"])
        .arg(&rebuilt)
        .arg(fixture.path("base"))
        .arg(&delta)
        .assert()
        .success();

    assert_eq!(fs::read(&rebuilt).expect("read rebuilt"), fixture.target);
}

#[test]
fn delta_reads_target_from_stdin() {
    let fixture = Fixture::new();
    let output = blockdelta()
        .args(["delta", "--json"])
        .arg(fixture.path("base"))
        .arg("-")
        .write_stdin(fixture.target.clone())
        .output()
        .expect("run blockdelta");
    assert!(output.status.success());

    let script: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(script["target_len"], fixture.target.len());
    let ops = script["ops"].as_array().expect("ops array");
    assert!(ops.iter().any(|op| op["op"] == "copy"));
    assert!(ops.iter().any(|op| op["op"] == "write"));
}

#[test]
fn patch_rejects_stdin_base() {
    let fixture = Fixture::new();
    blockdelta()
        .args(["patch", "-"])
        .arg(fixture.path("delta"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("seekable"));
}

#[test]
fn missing_base_is_a_stream_state_error() {
    let fixture = Fixture::new();
    blockdelta()
        .arg("signature")
        .arg(fixture.path("absent"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not readable"));
}

#[test]
fn zero_block_size_is_rejected() {
    let fixture = Fixture::new();
    blockdelta()
        .args(["signature", "-B", "0"])
        .arg(fixture.path("base"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("block size must be greater than zero"));
}

#[test]
fn buffer_not_larger_than_block_is_rejected() {
    let fixture = Fixture::new();
    blockdelta()
        .args(["delta", "-B", "4K", "--buffer-size", "4K"])
        .arg(fixture.path("base"))
        .arg(fixture.path("target"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("must be larger than block size"));
}
