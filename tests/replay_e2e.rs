//! Replay-mode runs driven entirely from files on disk

use std::collections::BTreeMap;

use oracle_core::{encode_blob_record, HostConfig, InputSource, Mode};
use oracle_host::{ExitReason, HostError, HostRunner, RunReport};

const HELLO_KEY: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

const HELLO_GUEST: &str = r#"(module
    (import "_gotest" "get_preimage_len" (func $len (param i32) (result i32)))
    (import "_gotest" "get_preimage_from_oracle" (func $get (param i32 i32 i32) (result i32)))
    (import "env" "wasm_output" (func $out (param i64)))
    (memory (export "memory") 1)
    (data (i32.const 0) "\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa\aa")
    (func (export "_start") (local $n i32)
        (local.set $n (call $len (i32.const 0)))
        (call $out (i64.extend_i32_u (local.get $n)))
        (drop (call $get (i32.const 0) (i32.const 100) (local.get $n)))
        (call $out (i64.load8_u (i32.const 100)))
        (call $out (i64.load8_u (i32.const 104)))
        (call $out (i64.load8_u (i32.const 105)))))"#;

/// Reads one input item: its length, then its single chunk; asserts the length is 5
const FEED_GUEST: &str = r#"(module
    (import "env" "wasm_input" (func $input (param i32) (result i64)))
    (import "env" "require" (func $require (param i32)))
    (import "env" "wasm_output" (func $out (param i64)))
    (memory (export "memory") 1)
    (func (export "_start")
        (call $require (i64.eq (call $input (i32.const 1)) (i64.const 5)))
        (call $out (call $input (i32.const 0)))))"#;

fn run(config: HostConfig, guest: &str) -> oracle_host::Result<RunReport> {
    let wasm = wat::parse_str(guest).unwrap();
    HostRunner::builder(config).inherit_stdio(false).build()?.run(&wasm)
}

fn write_hello_table(dir: &std::path::Path) {
    let table = BTreeMap::from([(HELLO_KEY.to_string(), "48656c6c6f".to_string())]);
    std::fs::write(
        dir.join("preimages.json"),
        serde_json::to_string(&table).unwrap(),
    )
    .unwrap();
}

#[test]
fn test_offline_hello_from_json() {
    let dir = tempfile::tempdir().unwrap();
    write_hello_table(dir.path());

    let report = run(HostConfig::new(Mode::Offline).with_data_dir(dir.path()), HELLO_GUEST).unwrap();
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.outputs, vec![5, 0x48, 0x6f, 0]);
    assert_eq!(report.peak_memory_bytes, 65536);
}

#[test]
fn test_sequential_hello_from_blob() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("preimages.bin"), encode_blob_record(b"Hello")).unwrap();

    let report = run(HostConfig::new(Mode::Sequential).with_data_dir(dir.path()), HELLO_GUEST).unwrap();
    assert_eq!(report.exit, ExitReason::Completed);
    assert_eq!(report.outputs, vec![5, 0x48, 0x6f, 0]);
}

#[test]
fn test_exhausted_blob_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("preimages.bin"), b"").unwrap();

    let report = run(HostConfig::new(Mode::Sequential).with_data_dir(dir.path()), HELLO_GUEST).unwrap();
    assert!(matches!(report.exit, ExitReason::Fatal(ref msg) if msg.contains("End of data")));
    assert_eq!(report.exit_code(), 1);
    assert!(report.outputs.is_empty());
}

#[test]
fn test_missing_table_fails_before_execution() {
    let dir = tempfile::tempdir().unwrap();
    let err = run(HostConfig::new(Mode::Offline).with_data_dir(dir.path()), HELLO_GUEST).unwrap_err();
    assert!(matches!(err, HostError::Preimage(oracle_core::Error::Load(_))));
}

#[test]
fn test_malformed_table_fails_before_execution() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("preimages.json"), r#"{"0x12": "zz"}"#).unwrap();
    let err = run(HostConfig::new(Mode::Offline).with_data_dir(dir.path()), HELLO_GUEST).unwrap_err();
    assert!(matches!(err, HostError::Preimage(oracle_core::Error::Load(_))));
}

#[test]
fn test_input_feed_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("host.json");
    HostConfig::new(Mode::InputFeed)
        .with_inputs(vec!["68656c6c6f".into()])
        .save(&path)
        .unwrap();

    let report = run(HostConfig::load(&path).unwrap(), FEED_GUEST).unwrap();
    assert_eq!(report.exit, ExitReason::Completed);
    assert_eq!(report.outputs, vec![0x68656c6c6f]);
}

#[test]
fn test_input_feed_require_failure() {
    let config = HostConfig::new(Mode::InputFeed).with_inputs(vec!["68656c6c".into()]);
    let report = run(config, FEED_GUEST).unwrap();
    assert_eq!(report.exit, ExitReason::AssertionFailed);
    assert_eq!(report.exit_code(), 1);
    assert!(report.outputs.is_empty());
}

#[test]
fn test_input_feed_from_blob_words() {
    let dir = tempfile::tempdir().unwrap();
    let mut words = 5u64.to_be_bytes().to_vec();
    words.extend_from_slice(&0x68656c6c6fu64.to_be_bytes());
    std::fs::write(dir.path().join("preimages.bin"), words).unwrap();

    let config = HostConfig::new(Mode::InputFeed)
        .with_data_dir(dir.path())
        .with_input_source(InputSource::Blob);
    let report = run(config, FEED_GUEST).unwrap();
    assert_eq!(report.outputs, vec![0x68656c6c6f]);
}

#[test]
fn test_feed_exhaustion_is_fatal() {
    let report = run(HostConfig::new(Mode::InputFeed), FEED_GUEST).unwrap();
    assert!(matches!(report.exit, ExitReason::Fatal(ref msg) if msg.contains("exhausted")));
}
