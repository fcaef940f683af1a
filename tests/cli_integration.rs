//! Integration tests for the credvault CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`. The
//! password comes from `CREDVAULT_PASSWORD` so nothing prompts.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const PASSWORD: &str = "integration-pass";

/// Helper: get a Command pointing at the credvault binary.
fn credvault() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("credvault").expect("binary should exist");
    cmd.env_remove("CREDVAULT_BACKEND")
        .env_remove("CREDVAULT_LOG")
        .env_remove("CREDVAULT_PASSWORD");
    cmd
}

/// A project directory with cheap Argon2 settings and an initialised store.
fn initialised_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    tmp.child(".credvault.toml")
        .write_str("argon2_memory_kib = 8192\nargon2_iterations = 1\nargon2_parallelism = 1\n")
        .unwrap();

    credvault()
        .arg("init")
        .current_dir(tmp.path())
        .env("CREDVAULT_PASSWORD", PASSWORD)
        .assert()
        .success()
        .stdout(predicate::str::contains("Store created"));

    tmp
}

#[test]
fn help_flag_shows_usage() {
    credvault()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Namespaced credential vault"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("set"))
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("clear"))
        .stdout(predicate::str::contains("call"));
}

#[test]
fn no_args_shows_help() {
    credvault()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn completions_generate_a_script() {
    credvault()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("credvault"));
}

#[test]
fn init_creates_store_header() {
    let tmp = initialised_project();
    tmp.child(".credvault/store.json")
        .assert(predicate::path::exists());
}

#[test]
fn init_twice_fails() {
    let tmp = initialised_project();
    credvault()
        .arg("init")
        .current_dir(tmp.path())
        .env("CREDVAULT_PASSWORD", PASSWORD)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn init_rejects_short_password() {
    let tmp = TempDir::new().unwrap();
    credvault()
        .arg("init")
        .current_dir(tmp.path())
        .env("CREDVAULT_PASSWORD", "short")
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 8"));
}

#[test]
fn set_get_list_delete_round_trip() {
    let tmp = initialised_project();
    let run = |args: &[&str]| {
        let mut cmd = credvault();
        cmd.args(args)
            .current_dir(tmp.path())
            .env("CREDVAULT_PASSWORD", PASSWORD);
        cmd
    };

    run(&["set", "mail", "imap", "s3cret"]).assert().success();

    run(&["get", "mail", "imap"])
        .assert()
        .success()
        .stdout("s3cret\n");

    run(&["get", "mail", "imap", "--base64"])
        .assert()
        .success()
        .stdout("czNjcmV0\n");

    run(&["list", "mail"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mail: 1 secret(s)"))
        .stdout(predicate::str::contains("imap"))
        .stdout(predicate::str::contains("s3cret").not());

    run(&["list", "mail", "--show-values"])
        .assert()
        .success()
        .stdout(predicate::str::contains("s3cret"));

    run(&["delete", "mail", "imap", "--force"]).assert().success();

    run(&["get", "mail", "imap"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn set_reads_piped_stdin() {
    let tmp = initialised_project();
    credvault()
        .args(["set", "svc", "token"])
        .current_dir(tmp.path())
        .env("CREDVAULT_PASSWORD", PASSWORD)
        .write_stdin("from-stdin\n")
        .assert()
        .success();

    credvault()
        .args(["get", "svc", "token"])
        .current_dir(tmp.path())
        .env("CREDVAULT_PASSWORD", PASSWORD)
        .assert()
        .success()
        .stdout("from-stdin\n");
}

#[test]
fn wrong_password_fails() {
    let tmp = initialised_project();
    credvault()
        .args(["get", "svc", "token"])
        .current_dir(tmp.path())
        .env("CREDVAULT_PASSWORD", "not-the-password")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Decryption failed"));
}

#[test]
fn get_without_store_fails() {
    let tmp = TempDir::new().unwrap();
    credvault()
        .args(["get", "svc", "token"])
        .current_dir(tmp.path())
        .env("CREDVAULT_PASSWORD", PASSWORD)
        .assert()
        .failure()
        .stderr(predicate::str::contains("credvault init"));
}

#[test]
fn clear_removes_the_namespace() {
    let tmp = initialised_project();
    for key in ["a", "b"] {
        credvault()
            .args(["set", "svc", key, "v"])
            .current_dir(tmp.path())
            .env("CREDVAULT_PASSWORD", PASSWORD)
            .assert()
            .success();
    }

    credvault()
        .args(["clear", "svc", "--force"])
        .current_dir(tmp.path())
        .env("CREDVAULT_PASSWORD", PASSWORD)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 secret(s) removed"));
}

#[test]
fn call_answers_each_request_line() {
    let input = concat!(
        r#"{"operation":"set","namespace":"svc","key":"k","value":"dg=="}"#,
        "\n",
        r#"{"operation":"get","namespace":"svc","key":"k"}"#,
        "\n",
        r#"{"operation":"get","namespace":"svc","key":"missing"}"#,
        "\n",
        r#"{"operation":"explode"}"#,
        "\n",
    );

    let output = credvault()
        .args(["--backend", "memory", "call"])
        .write_stdin(input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let lines: Vec<serde_json::Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["result"]["type"], "stored");
    assert_eq!(lines[1]["result"]["value"], "dg==");
    assert_eq!(lines[2]["kind"], "NotFound");
    assert_eq!(lines[3]["kind"], "NotImplemented");
}

#[test]
fn call_against_file_store_persists() {
    let tmp = initialised_project();
    credvault()
        .arg("call")
        .current_dir(tmp.path())
        .env("CREDVAULT_PASSWORD", PASSWORD)
        .write_stdin("{\"operation\":\"set\",\"namespace\":\"api\",\"key\":\"token\",\"value\":\"eHl6\"}\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\":\"ok\""));

    credvault()
        .args(["get", "api", "token"])
        .current_dir(tmp.path())
        .env("CREDVAULT_PASSWORD", PASSWORD)
        .assert()
        .success()
        .stdout("xyz\n");
}

#[test]
fn invalid_namespace_is_rejected() {
    credvault()
        .args(["--backend", "memory", "get", "", "k"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid arguments"));
}

#[test]
fn empty_namespace_lists_a_single_notice() {
    credvault()
        .args(["--backend", "memory", "list", "svc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No secrets in namespace 'svc'"))
        .stdout(predicate::str::contains("secret(s)").not());
}
