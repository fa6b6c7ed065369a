use assert_cmd::Command;
use predicates::prelude::*;

/// Helper to create a test command with provider env overrides scrubbed
fn makerctl() -> Command {
    let mut cmd = Command::cargo_bin("makerctl").unwrap();
    for var in [
        "MAKERCTL_CONFIG_FILE",
        "MAKERCTL_DO_TOKEN",
        "MAKERCTL_DO_REGION",
        "MAKERCTL_GCP_KEYFILE",
        "MAKERCTL_GCP_ZONE",
        "MAKERCTL_GCP_PROJECT",
        "AWS_ACCESS_KEY_ID",
        "AWS_SECRET_ACCESS_KEY",
        "AWS_DEFAULT_REGION",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_flag() {
    makerctl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("DigitalOcean"))
        .stdout(predicate::str::contains("EXAMPLES:"));
}

#[test]
fn test_version_flag() {
    makerctl()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("makerctl"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_version_subcommand() {
    makerctl()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("makerctl"));
}

#[test]
fn test_no_args_shows_usage() {
    makerctl()
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_invalid_subcommand() {
    makerctl()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_create_requires_object() {
    makerctl()
        .arg("create")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_create_vm_help_lists_flags() {
    makerctl()
        .args(["create", "vm", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--provider"))
        .stdout(predicate::str::contains("--size"))
        .stdout(predicate::str::contains("--image"));
}

#[test]
fn test_provider_value_is_validated() {
    makerctl()
        .args(["create", "vm", "-p", "azure", "-n", "x", "-s", "s", "-i", "i"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_missing_required_flag_is_a_usage_error() {
    makerctl()
        .args(["create", "vm", "-p", "do", "-n", "x"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--size"));
}

#[test]
fn test_unconfigured_provider_points_at_auth() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");

    makerctl()
        .args(["status", "vm", "-p", "do", "-n", "test-vm"])
        .arg("--config-file")
        .arg(&config)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("makerctl auth --provider do"));
}

#[test]
fn test_wait_flags_are_accepted() {
    // Still fails (no credentials) but the flags must parse.
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");

    makerctl()
        .args([
            "delete",
            "cluster",
            "-p",
            "aws",
            "-n",
            "demo",
            "--wait-interval",
            "5",
            "--wait-timeout",
            "60",
        ])
        .arg("--config-file")
        .arg(&config)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("aws"));
}

#[test]
fn test_completions_generate() {
    makerctl()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("makerctl"));
}
