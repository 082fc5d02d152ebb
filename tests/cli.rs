//! End-to-end tests for the `docsearch` binary.

#![allow(clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn docsearch() -> Command {
    let mut cmd = Command::cargo_bin("docsearch").unwrap();
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("DOCSEARCH_API_KEY")
        .env_remove("DOCSEARCH_PROMPT_DIR")
        .env_remove("DOCSEARCH_MODEL_LIMITS")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    docsearch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ask-file"))
        .stdout(predicate::str::contains("init-prompts"));
}

#[test]
fn test_tokens_command() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("doc.txt");
    std::fs::write(&path, "one two three four").unwrap();

    docsearch()
        .arg("tokens")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("~5 tokens"))
        .stdout(predicate::str::contains("budget 3000: fits"));
}

#[test]
fn test_tokens_honors_model_limit_overrides() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("doc.txt");
    std::fs::write(&path, "a".repeat(13_000)).unwrap();

    docsearch()
        .env("DOCSEARCH_MODEL_LIMITS", "gpt-4o=120000")
        .args(["tokens", "--model", "gpt-4o"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("gpt-4o budget 120000: fits"));
}

#[test]
fn test_tokens_rejects_malformed_limits() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("doc.txt");
    std::fs::write(&path, "text").unwrap();

    docsearch()
        .env("DOCSEARCH_MODEL_LIMITS", "gpt-4o")
        .arg("tokens")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("model_limits"));
}

#[test]
fn test_init_prompts_into_directory() {
    let dir = TempDir::new().unwrap();

    docsearch()
        .args(["init-prompts", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 6 prompt template(s)"));

    assert!(dir.path().join("combine.md").is_file());
    assert!(dir.path().join("sql.md").is_file());
}

#[test]
fn test_ask_without_api_key_fails() {
    docsearch()
        .args(["ask", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no LLM API key configured"));
}

#[test]
fn test_ask_file_missing_file_fails() {
    docsearch()
        .env("OPENAI_API_KEY", "test")
        .args(["ask-file", "/nonexistent/notes.txt", "who?"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("I/O error"));
}
