//! CLI argument parsing tests for the nft command.
//!
//! These tests verify that command-line arguments are correctly parsed
//! without requiring network access or root privileges.

use assert_cmd::Command;
use predicates::prelude::*;

fn nft_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_nft"))
}

mod global_flags {
    use super::*;

    #[test]
    fn test_help() {
        nft_cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("nftables management tool"))
            .stdout(predicate::str::contains("--json"))
            .stdout(predicate::str::contains("--netns"));
    }

    #[test]
    fn test_version() {
        nft_cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("nft"));
    }

    #[test]
    fn test_invalid_subcommand() {
        nft_cmd()
            .arg("invalid_command")
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }
}

mod table_command {
    use super::*;

    #[test]
    fn test_table_help() {
        nft_cmd()
            .args(["table", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Manage tables"));
    }

    #[test]
    fn test_table_alias() {
        nft_cmd().args(["t", "--help"]).assert().success();
    }

    #[test]
    fn test_table_add_requires_name() {
        nft_cmd()
            .args(["table", "add"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("<NAME>"));
    }

    #[test]
    fn test_table_add_rejects_unknown_family() {
        nft_cmd()
            .args(["table", "add", "filter", "-f", "ipx"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown table family"));
    }

    #[test]
    fn test_table_delete_alias() {
        nft_cmd().args(["table", "del", "--help"]).assert().success();
    }
}

mod quota_command {
    use super::*;

    #[test]
    fn test_quota_add_help() {
        nft_cmd()
            .args(["quota", "add", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--over"));
    }

    #[test]
    fn test_quota_add_requires_bytes() {
        nft_cmd()
            .args(["quota", "add", "filter", "monthly"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("<BYTES>"));
    }

    #[test]
    fn test_quota_add_rejects_non_numeric_bytes() {
        nft_cmd()
            .args(["quota", "add", "filter", "monthly", "lots"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid value"));
    }
}

mod monitor_command {
    use super::*;

    #[test]
    fn test_monitor_help() {
        nft_cmd()
            .args(["monitor", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("ruleset"))
            .stdout(predicate::str::contains("destroy"));
    }

    #[test]
    fn test_monitor_rejects_unknown_object() {
        nft_cmd()
            .args(["monitor", "new", "routes"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid value"));
    }
}
