//! End-to-end coverage of the `hook` subcommand across both output
//! formats and several tool-call shapes (spec §4.6).

use assert_cmd::Command;
use predicates::prelude::*;
use std::os::unix::fs::PermissionsExt;

fn cmd() -> Command {
    Command::cargo_bin("pathgate").unwrap()
}

#[test]
fn claude_format_denies_ssh_key_read() {
    let dir = tempfile::tempdir().unwrap();
    let ssh = dir.path().join(".ssh");
    std::fs::create_dir_all(&ssh).unwrap();
    let key = ssh.join("id_ed25519");
    std::fs::write(&key, "x").unwrap();
    std::fs::set_permissions(&key, std::fs::Permissions::from_mode(0o600)).unwrap();

    let payload = serde_json::json!({
        "session_id": "s1",
        "tool_name": "Read",
        "tool_input": { "file_path": key.to_str().unwrap() },
        "cwd": dir.path().to_str().unwrap(),
    });

    cmd()
        .arg("hook")
        .arg("--format")
        .arg("claude")
        .write_stdin(payload.to_string())
        .assert()
        .code(2)
        .stdout(predicate::str::contains("\"permissionDecision\":\"deny\""))
        .stderr(predicate::str::contains("Blocked by"));
}

#[test]
fn gemini_format_allows_ordinary_write() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("notes.txt");

    let payload = serde_json::json!({
        "tool_name": "Write",
        "tool_input": { "file_path": file.to_str().unwrap() },
        "cwd": dir.path().to_str().unwrap(),
    });

    cmd()
        .arg("hook")
        .arg("--format")
        .arg("gemini")
        .write_stdin(payload.to_string())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"decision\":\"allow\""));
}

#[test]
fn bash_command_with_env_file_redirect_is_denied() {
    let dir = tempfile::tempdir().unwrap();
    let payload = serde_json::json!({
        "tool_name": "Bash",
        "tool_input": { "command": format!("echo SECRET=1 >> {}/.env", dir.path().display()) },
        "cwd": dir.path().to_str().unwrap(),
    });

    cmd()
        .arg("hook")
        .write_stdin(payload.to_string())
        .assert()
        .code(2);
}

#[test]
fn unrecognized_tool_allows_without_evaluation() {
    let payload = serde_json::json!({
        "tool_name": "WebSearch",
        "tool_input": { "query": "rust ownership" },
        "cwd": "/tmp",
    });

    cmd()
        .arg("hook")
        .write_stdin(payload.to_string())
        .assert()
        .success();
}
