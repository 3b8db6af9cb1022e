use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

/// `penny` with a clean environment and a throwaway home directory.
fn penny(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("penny").unwrap();
    cmd.env_clear()
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .current_dir(home);
    cmd
}

#[test]
fn test_no_command_prints_help() {
    let home = tempfile::tempdir().unwrap();
    penny(home.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("monitor"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_validate_lists_every_missing_setting() {
    let home = tempfile::tempdir().unwrap();
    penny(home.path())
        .arg("validate")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("EMAIL_ADDRESS is not set"))
        .stdout(predicate::str::contains("EMAIL_PASSWORD is not set"))
        .stdout(predicate::str::contains("alert@zellepay.com"))
        .stderr(predicate::str::contains("validation check(s) failed"));
}

#[test]
fn test_check_refuses_to_start_without_credentials() {
    let home = tempfile::tempdir().unwrap();
    penny(home.path())
        .arg("check")
        .env("CHECK_INTERVAL", "soon")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"))
        .stderr(predicate::str::contains("EMAIL_PASSWORD is not set"))
        .stderr(predicate::str::contains("CHECK_INTERVAL='soon' is invalid"));
}

#[test]
fn test_stats_on_missing_ledger_shows_zero() {
    let home = tempfile::tempdir().unwrap();
    let ledger = home.path().join("payments.csv");
    penny(home.path())
        .arg("stats")
        .env("LEDGER_PATH", &ledger)
        .assert()
        .success()
        .stdout(predicate::str::contains("Total payments"))
        .stdout(predicate::str::contains("$0.00"))
        .stdout(predicate::str::contains("No payments recorded yet."));
}

#[test]
fn test_stats_summarizes_existing_ledger() {
    let home = tempfile::tempdir().unwrap();
    let ledger = home.path().join("payments.csv");
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    std::fs::write(
        &ledger,
        format!(
            "Date,Amount,Source,Client Name,Email Subject,Processed Date\n\
             {today},1200.00,Zelle,John Smith,You received a payment,{today} 10:00:00\n\
             {today},75.00,Venmo,Jane Doe,Jane Doe paid you $75.00,{today} 10:05:00\n"
        ),
    )
    .unwrap();

    penny(home.path())
        .arg("stats")
        .env("LEDGER_PATH", &ledger)
        .assert()
        .success()
        .stdout(predicate::str::contains("$1,275.00"))
        .stdout(predicate::str::contains("$637.50"))
        .stdout(predicate::str::contains("Venmo"));
}

#[test]
fn test_init_writes_settings_and_ledger() {
    let home = tempfile::tempdir().unwrap();
    let ledger = home.path().join("books").join("payments.csv");
    penny(home.path())
        .args(["init", "--email", "tutor@example.com", "--interval", "120", "--ledger"])
        .arg(&ledger)
        .assert()
        .success()
        .stdout(predicate::str::contains("Ledger ready"));

    let settings =
        std::fs::read_to_string(home.path().join(".config/penny/settings.json")).unwrap();
    assert!(settings.contains("tutor@example.com"));
    assert!(settings.contains("120"));
    assert!(!settings.contains("password"));

    let header = std::fs::read_to_string(&ledger).unwrap();
    assert!(header.starts_with("Date,Amount,Source,Client Name,Email Subject,Processed Date"));
}

/// A port on localhost with nothing listening on it.
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn with_unreachable_mailbox(cmd: &mut Command, home: &Path) {
    cmd.env("EMAIL_ADDRESS", "tutor@example.com")
        .env("EMAIL_PASSWORD", "wrong-password")
        .env("IMAP_SERVER", "127.0.0.1")
        .env("IMAP_PORT", closed_port().to_string())
        .env("LEDGER_PATH", home.join("payments.csv"));
}

#[test]
fn test_check_fails_fast_when_mailbox_unreachable() {
    let home = tempfile::tempdir().unwrap();
    let mut cmd = penny(home.path());
    with_unreachable_mailbox(&mut cmd, home.path());
    cmd.arg("check")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Mail connection failed"));
}

#[test]
fn test_monitor_exits_instead_of_looping_when_mailbox_unreachable() {
    let home = tempfile::tempdir().unwrap();
    let mut cmd = penny(home.path());
    with_unreachable_mailbox(&mut cmd, home.path());
    cmd.arg("monitor")
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Mail connection failed"));
}

#[test]
fn test_env_file_supplies_settings() {
    let home = tempfile::tempdir().unwrap();
    let ledger = home.path().join("from-dotenv.csv");
    std::fs::write(
        home.path().join(".env"),
        format!("EXCEL_FILE_PATH={}\n", ledger.display()),
    )
    .unwrap();
    penny(home.path())
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("from-dotenv.csv"));
}
