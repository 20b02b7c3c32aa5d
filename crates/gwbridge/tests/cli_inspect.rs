#![cfg(all(unix, feature = "cli"))]

use std::path::PathBuf;
use std::process::{Command, Output};

use gwbridge::chunk::CHUNK_SIZE;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/gwbcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn gwbridge(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gwbridge"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("gwbridge should run")
}

#[test]
fn encode_then_inspect_shows_request() {
    let dir = unique_temp_dir("inspect");
    let dump = dir.join("request.chunk");
    let dump_arg = dump.to_str().expect("utf-8 temp path");

    let encoded = gwbridge(&[
        "encode",
        dump_arg,
        "--method",
        "POST",
        "--uri",
        "/api/items",
        "-H",
        "Content-Type: application/json",
        "-H",
        "Accept: text/html, application/gzip",
        "-H",
        "Accept-Encoding: gzip, br",
        "--body",
        "{\"id\":1}",
        "--session",
        "00000001000000000000007B",
    ]);
    assert!(encoded.status.success(), "{}", String::from_utf8_lossy(&encoded.stderr));
    assert_eq!(
        std::fs::metadata(&dump).expect("dump written").len(),
        CHUNK_SIZE as u64
    );

    let inspected = gwbridge(&["inspect", dump_arg]);
    assert!(inspected.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&inspected.stdout).expect("stdout should be JSON");

    assert_eq!(json["method"], "POST");
    assert_eq!(json["uri"], "/api/items");
    assert_eq!(json["gzip_accepted"], true);
    assert_eq!(json["body"], "{\"id\":1}");
    assert_eq!(json["session"], "00000001000000000000007B");
    assert_eq!(json["session_cookie"], "00000001000000000000007B");
    assert_eq!(json["link"], serde_json::Value::Null);
    assert_eq!(json["headers"][0]["name"], "Content-Type");
    assert_eq!(json["headers"][2]["name"], "Accept-Encoding");
    assert_eq!(json["headers"][3]["name"], "Cookie");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn gzip_media_type_alone_does_not_enable_gzip() {
    let dir = unique_temp_dir("accept");
    let dump = dir.join("accept.chunk");
    let dump_arg = dump.to_str().expect("utf-8 temp path");

    let encoded = gwbridge(&["encode", dump_arg, "-H", "Accept: application/x-gzip"]);
    assert!(encoded.status.success());

    let inspected = gwbridge(&["inspect", dump_arg]);
    assert!(inspected.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&inspected.stdout).expect("stdout should be JSON");
    assert_eq!(json["gzip_accepted"], false);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn inspect_rejects_wrong_size_dump() {
    let dir = unique_temp_dir("short");
    let dump = dir.join("short.chunk");
    std::fs::write(&dump, [0u8; 100]).expect("write dump");

    let output = gwbridge(&["inspect", dump.to_str().expect("utf-8 temp path")]);
    assert_eq!(output.status.code(), Some(60));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn inspect_rejects_corrupt_offset_table() {
    let dir = unique_temp_dir("corrupt");
    let dump = dir.join("corrupt.chunk");
    let dump_arg = dump.to_str().expect("utf-8 temp path");

    let encoded = gwbridge(&["encode", dump_arg, "-H", "Host: example.test"]);
    assert!(encoded.status.success());

    // Link (8) + transport header (32) + identities (32) + header count slot (156).
    let mut bytes = std::fs::read(&dump).expect("read dump");
    bytes[8 + 32 + 32 + 156] = 17;
    std::fs::write(&dump, &bytes).expect("rewrite dump");

    let output = gwbridge(&["inspect", dump_arg]);
    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("malformed offset table"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn inspect_missing_file_fails() {
    let output = gwbridge(&["inspect", "/nonexistent/gwbridge.chunk"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn encode_rejects_base_offset_inside_transport_header() {
    let dir = unique_temp_dir("base");
    let dump = dir.join("base.chunk");

    let output = gwbridge(&[
        "encode",
        dump.to_str().expect("utf-8 temp path"),
        "--base-offset",
        "8",
    ]);
    assert_eq!(output.status.code(), Some(64));
    assert!(!dump.exists());

    let _ = std::fs::remove_dir_all(&dir);
}
