use assert_cmd::Command;
use predicates::prelude::*;

fn poolctl() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("poolctl"));
    cmd.current_dir(std::env::temp_dir())
        .env_remove("POOLCTL_API_TOKEN")
        .env_remove("POOLCTL_CLUSTER");
    cmd
}

#[test]
fn help_lists_every_subcommand() {
    poolctl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("describe"))
        .stdout(predicate::str::contains("delete"));
}

#[test]
fn create_help_shows_flag_defaults() {
    poolctl()
        .args(["create", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--additional-security-group-ids"))
        .stdout(predicate::str::contains("[default: m5.xlarge]"))
        .stdout(predicate::str::contains("[default: on-demand]"));
}

#[test]
fn missing_cluster_is_reported() {
    poolctl()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: required flag \"--cluster\" not set"));
}

#[test]
fn missing_token_is_reported() {
    poolctl()
        .args(["list", "--cluster", "demo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: missing required env var: POOLCTL_API_TOKEN"));
}

#[test]
fn cluster_can_come_from_the_environment() {
    poolctl()
        .env("POOLCTL_CLUSTER", "demo")
        .args(["describe", "mp1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("POOLCTL_API_TOKEN"));
}

#[test]
fn unknown_output_format_is_a_usage_error() {
    poolctl()
        .args(["list", "--cluster", "demo", "--output", "yaml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid value 'yaml'"));
}
