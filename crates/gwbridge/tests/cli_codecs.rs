#![cfg(all(unix, feature = "cli"))]

use std::process::{Command, Output};

fn gwbridge(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gwbridge"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("gwbridge should run")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn socket_pack_then_unpack_roundtrips() {
    let packed = gwbridge(&[
        "socket",
        "pack",
        "--index",
        "334532",
        "--unique-id",
        "674346456",
        "--scheduler",
        "4",
        "--worker",
        "7",
    ]);
    assert!(packed.status.success());
    let packed = stdout_json(&packed);
    let compact = packed["compact"].as_str().expect("compact word");

    let unpacked = gwbridge(&["socket", "unpack", compact]);
    assert!(unpacked.status.success());
    let unpacked = stdout_json(&unpacked);
    assert_eq!(unpacked["index"], 334532);
    assert_eq!(unpacked["unique_id"], 674346456u32);
    assert_eq!(unpacked["scheduler_id"], 4);
    assert_eq!(unpacked["gateway_worker_id"], 7);
    assert_eq!(unpacked["wide"], packed["wide"]);
}

#[test]
fn socket_unpack_wide_words() {
    let output = gwbridge(&["socket", "unpack", "--wide", "3453346456", "0x100000142"]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["index"], 322);
    assert_eq!(json["unique_id"], 3453346456u32);
    assert_eq!(json["scheduler_id"], 1);
}

#[test]
fn socket_pack_overflow_returns_60() {
    let output = gwbridge(&["socket", "pack", "--index", "4194304", "--unique-id", "1"]);
    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("index"));
}

#[test]
fn socket_unpack_stray_bits_returns_60() {
    let output = gwbridge(&["socket", "unpack", "--wide", "0x100000000", "0"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn session_encode_renders_cookie() {
    let output = gwbridge(&["session", "encode", "--index", "1", "--salt", "123"]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["cookie"], "00000001000000000000007B");
    assert_eq!(json["header"], "ScSessionId=00000001000000000000007B");
}

#[test]
fn session_decode_accepts_cookie_header() {
    let output = gwbridge(&[
        "session",
        "decode",
        "theme=dark; ScSessionId=00000001000000000000007B",
    ]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["session_index"], 1);
    assert_eq!(json["random_salt"], 123);
    assert_eq!(json["valid"], true);
}

#[test]
fn session_decode_rejects_garbage() {
    let output = gwbridge(&["session", "decode", "not-a-session"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn unknown_subcommand_is_usage_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_gwbridge"))
        .arg("frobnicate")
        .output()
        .expect("gwbridge should run");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_gwbridge"))
        .arg("version")
        .output()
        .expect("gwbridge should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}
