use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let sandbox = Self { dir: tempfile::tempdir().expect("tempdir") };
        sandbox.run(&["init"]).success();
        sandbox
    }

    fn db(&self) -> PathBuf {
        self.dir.path().join("runway.db")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("runway").expect("binary exists");
        cmd.env("HOME", self.dir.path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .arg("--db")
            .arg(self.db());
        cmd
    }

    fn run(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert()
    }
}

#[test]
fn init_creates_database() {
    let sandbox = Sandbox::new();
    assert!(sandbox.db().exists());
    sandbox.run(&["accounts", "list"]).success().stdout(contains("Default"));
}

#[test]
fn missing_database_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("runway")
        .unwrap()
        .env("HOME", dir.path())
        .args(["--db", dir.path().join("absent.db").to_str().unwrap(), "ledger"])
        .assert()
        .failure()
        .stderr(contains("runway init"));
}

#[test]
fn ledger_shows_recurring_rows_with_running_balance() {
    let sandbox = Sandbox::new();
    sandbox.run(&["balance", "set", "1000", "--at", "2020-01-01"]).success();
    sandbox
        .run(&["recurring", "add", "Rent", "500", "--start", "2020-01-01", "--frequency", "monthly"])
        .success()
        .stdout(contains("monthly"));

    sandbox
        .run(&["ledger", "--from", "2020-01-01", "--limit", "3"])
        .success()
        .stdout(contains("Rent").and(contains("$500.00")).and(contains("-$500.00")));
}

#[test]
fn matching_transaction_updates_category() {
    let sandbox = Sandbox::new();
    sandbox.run(&["irregular", "category", "Groceries"]).success();
    sandbox.run(&["irregular", "rule", "Groceries", "grocer"]).success();
    sandbox
        .run(&["txn", "add", "Local Grocer", "-20", "--date", "2023-04-02"])
        .success()
        .stdout(contains("Updated \u{2018}Groceries\u{2019}"));
    sandbox
        .run(&["irregular", "list"])
        .success()
        .stdout(contains("grocer").and(contains("$20.00")).and(contains("2023-04-02")));
}

#[test]
fn unmatched_transaction_updates_nothing() {
    let sandbox = Sandbox::new();
    sandbox
        .run(&["txn", "add", "Paycheck", "900", "--date", "2023-04-03"])
        .success()
        .stdout(contains("Updated").not());
    sandbox.run(&["txn", "list"]).success().stdout(contains("Paycheck"));
}

#[test]
fn unknown_frequency_is_rejected() {
    let sandbox = Sandbox::new();
    sandbox
        .run(&["recurring", "add", "Gym", "30", "--start", "2023-01-01", "--frequency", "montly"])
        .failure()
        .stderr(contains("Unknown frequency"));
}

#[test]
fn unknown_account_is_rejected() {
    let sandbox = Sandbox::new();
    sandbox
        .run(&["--account", "Nope", "balance", "show"])
        .failure()
        .stderr(contains("Unknown account"));
}

#[test]
fn forecast_without_history_says_so() {
    let sandbox = Sandbox::new();
    sandbox.run(&["irregular", "category", "Auto"]).success();
    sandbox
        .run(&["irregular", "forecast", "Auto", "--from", "2024-01-01", "--to", "2024-03-01"])
        .success()
        .stdout(contains("Not enough history"));
}
