//! The `rasff` binary's command-line surface.

use assert_cmd::Command;
use predicates::prelude::*;

fn rasff() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rasff"))
}

#[test]
fn test_list_countries_prints_table_and_writes_nothing() {
    let dir = tempfile::tempdir().expect("temp dir");

    rasff()
        .current_dir(dir.path())
        .arg("--list-countries")
        .assert()
        .success()
        .stdout(predicate::str::contains("RASFF Country Codes (Europe)"))
        .stdout(predicate::str::contains("SWITZERLAND 5004"))
        .stdout(predicate::str::contains("Usage: rasff --country CODE"));

    let leftovers = std::fs::read_dir(dir.path()).expect("read dir").count();
    assert_eq!(leftovers, 0);
}

#[test]
fn test_list_countries_ignores_country() {
    let dir = tempfile::tempdir().expect("temp dir");

    rasff()
        .current_dir(dir.path())
        .args(["--country", "5029", "--list-countries"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PORTUGAL 5029"));

    assert!(!dir.path().join("notifications-5029.xlsx").exists());
}

#[test]
fn test_unknown_flag_is_usage_error() {
    rasff()
        .arg("--bogus")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_missing_country_value_is_usage_error() {
    rasff()
        .arg("--country")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--country"));
}

#[test]
fn test_help_mentions_both_flags() {
    rasff()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--country"))
        .stdout(predicate::str::contains("--list-countries"));
}
