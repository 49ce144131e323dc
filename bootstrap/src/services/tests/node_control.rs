//! Tests for ControlClient
//!
//! Argument layout and output interpretation are checked against a mocked
//! command runner; one test drives a fake control script end to end.

use std::path::Path;

use crate::config::RpcCredentials;
use crate::error::BootstrapError;
use crate::services::ControlClient;
use crate::traits::{CommandOutput, MockCommandRunner, NodeControl};

fn credentials() -> RpcCredentials {
    RpcCredentials::new("alice", "password")
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn stdout(text: &str) -> CommandOutput {
    CommandOutput {
        status: Some(0),
        stdout: text.to_string(),
        stderr: String::new(),
    }
}

fn stderr(text: &str) -> CommandOutput {
    CommandOutput {
        status: Some(1),
        stdout: String::new(),
        stderr: text.to_string(),
    }
}

#[test]
fn test_argument_layout() {
    let client = ControlClient::new(MockCommandRunner::new(), "bin/bchctl", credentials());

    assert_eq!(
        client.ping_args(),
        strings(&["--rpcuser=alice", "--rpcpass=password", "--testnet", "ping"])
    );
    assert_eq!(
        client.generate_args(105),
        strings(&[
            "--testnet",
            "--rpcuser=alice",
            "--rpcpass=password",
            "generate",
            "--skipverify",
            "105",
        ])
    );
}

#[tokio::test]
async fn test_ping_passes_stderr_through() {
    let expected = strings(&["--rpcuser=alice", "--rpcpass=password", "--testnet", "ping"]);
    let mut calls = 0;
    let mut runner = MockCommandRunner::new();
    runner
        .expect_run()
        .withf(move |program, args| program == Path::new("bin/bchctl") && args == expected.as_slice())
        .times(2)
        .returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(stderr("connection refused\n"))
            } else {
                Ok(stdout(""))
            }
        });

    let client = ControlClient::new(runner, "bin/bchctl", credentials());
    assert_eq!(client.ping().await.unwrap(), "connection refused\n");
    assert_eq!(client.ping().await.unwrap(), "");
}

#[tokio::test]
async fn test_ping_runner_failure_is_an_error() {
    let mut runner = MockCommandRunner::new();
    runner.expect_run().returning(|program, _| {
        Err(BootstrapError::CommandFailed {
            program: program.display().to_string(),
            message: "No such file or directory".to_string(),
        })
    });

    let client = ControlClient::new(runner, "bin/bchctl", credentials());
    assert!(client.ping().await.is_err());
}

#[tokio::test]
async fn test_generate_parses_block_hashes() {
    let mut runner = MockCommandRunner::new();
    runner
        .expect_run()
        .withf(|_, args| args.iter().any(|a| a == "generate") && args.last().map(String::as_str) == Some("2"))
        .times(1)
        .returning(|_, _| Ok(stdout("[\n  \"0f9188f1\",\n  \"3a1b2c4d\"\n]\n")));

    let client = ControlClient::new(runner, "bin/bchctl", credentials());
    let hashes = client.generate(2).await.unwrap();
    assert_eq!(hashes, strings(&["0f9188f1", "3a1b2c4d"]));
}

#[tokio::test]
async fn test_generate_error_output_is_fatal() {
    let mut runner = MockCommandRunner::new();
    runner
        .expect_run()
        .returning(|_, _| Ok(stderr("-1: No payment addresses specified via --miningaddr\n")));

    let client = ControlClient::new(runner, "bin/bchctl", credentials());
    let err = client.generate(105).await.unwrap_err();

    assert!(err.is_fatal());
    match err {
        BootstrapError::BlockGeneration { stderr } => {
            assert_eq!(stderr, "-1: No payment addresses specified via --miningaddr");
        }
        other => panic!("expected BlockGeneration, got {other:?}"),
    }
}

#[tokio::test]
async fn test_generate_tolerates_non_array_output() {
    let mut runner = MockCommandRunner::new();
    runner.expect_run().returning(|_, _| Ok(stdout("null")));

    let client = ControlClient::new(runner, "bin/bchctl", credentials());
    assert!(client.generate(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_generate_garbage_output_is_an_error() {
    let mut runner = MockCommandRunner::new();
    runner.expect_run().returning(|_, _| Ok(stdout("not json")));

    let client = ControlClient::new(runner, "bin/bchctl", credentials());
    let err = client.generate(1).await.unwrap_err();
    assert!(matches!(err, BootstrapError::Json(_)));
}

#[cfg(unix)]
#[tokio::test]
async fn test_against_fake_control_script() {
    use super::common::write_script;
    use crate::services::SystemCommandRunner;

    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "bchctl",
        r#"for last; do :; done
case "$*" in
  *ping*) exit 0 ;;
  *generate*) printf '["%s"]\n' "$last" ;;
esac"#,
    );

    let client = ControlClient::new(SystemCommandRunner::new(), script, credentials());
    assert_eq!(client.ping().await.unwrap(), "");
    assert_eq!(client.generate(7).await.unwrap(), strings(&["7"]));
}
