use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const STATEMENT: &str = "\
Beginning Balance $100.00
01/05/2024 CARD PURCHASE AMAZON 20.00
01/06/2024 COFFEE SHOP 5.50
01/07/2024 DIRECT DEPOSIT PAYROLL 30.00
Ending Balance $104.50
";

fn penny(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("penny").unwrap();
    cmd.env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn init(home: &Path) -> std::path::PathBuf {
    let data_dir = home.join("data");
    penny(home)
        .args(["init", "--data-dir"])
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized penny"));
    data_dir
}

#[test]
fn init_creates_layout() {
    let home = tempfile::tempdir().unwrap();
    let data_dir = init(home.path());
    assert!(data_dir.join("penny.db").exists());
    assert!(data_dir.join("uploads").is_dir());
    assert!(data_dir.join("statements").is_dir());
    assert!(home.path().join(".config/penny/settings.json").exists());

    penny(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Transactions:  0"))
        .stdout(predicate::str::contains("Last import:   never"));
}

#[test]
fn parse_prints_rows_without_storing() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("jan_ocr.txt");
    std::fs::write(&file, STATEMENT).unwrap();

    penny(home.path())
        .arg("parse")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("-$20.00"))
        .stdout(predicate::str::contains("+$30.00"))
        .stdout(predicate::str::contains("3 rows via generic"))
        .stdout(predicate::str::contains("rejected lines"));
}

#[test]
fn parse_writes_csv() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("jan_ocr.txt");
    let out = home.path().join("rows.csv");
    std::fs::write(&file, STATEMENT).unwrap();

    penny(home.path())
        .arg("parse")
        .arg(&file)
        .arg("--csv")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 3 rows"));

    let csv = std::fs::read_to_string(&out).unwrap();
    assert!(csv.starts_with("date,amount,direction"));
    assert!(csv.contains("2024-01-06,-5.50,debit"));
}

#[test]
fn parse_rejects_unknown_parser() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("jan_ocr.txt");
    std::fs::write(&file, STATEMENT).unwrap();

    penny(home.path())
        .arg("parse")
        .arg(&file)
        .args(["--parser", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown parser 'nope'"));

    penny(home.path())
        .arg("parse")
        .arg(&file)
        .args(["--parser", "chase_detail"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not recognize jan_ocr.txt"));
}

#[test]
fn validate_reconciles_balances() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("jan_ocr.txt");
    std::fs::write(&file, STATEMENT).unwrap();

    penny(home.path())
        .arg("validate")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("$104.50"))
        .stdout(predicate::str::contains("Reconciled"));

    std::fs::write(&file, STATEMENT.replace("$104.50", "$110.00")).unwrap();
    penny(home.path())
        .arg("validate")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Off by -$5.50"));
}

#[test]
fn import_twice_adds_nothing_new() {
    let home = tempfile::tempdir().unwrap();
    let data_dir = init(home.path());
    std::fs::write(data_dir.join("uploads/jan.txt"), STATEMENT).unwrap();

    penny(home.path())
        .arg("import")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rows: 3 parsed, 3 imported, 0 already present"));

    penny(home.path())
        .arg("import")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rows: 3 parsed, 0 imported, 3 already present"));

    penny(home.path())
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("jan.txt"))
        .stdout(predicate::str::contains("3 candidate lines, 3 stored rows"));

    penny(home.path())
        .arg("rejected")
        .assert()
        .success()
        .stdout(predicate::str::contains("no_generic_match"));
}

#[test]
fn commands_need_init() {
    let home = tempfile::tempdir().unwrap();
    penny(home.path())
        .arg("report")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Run `penny init` first"));
}

#[test]
fn parse_screenshot_text_only_with_flag() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("shot.txt");
    std::fs::write(&file, "Dec 03,2025 AMAZON MKTPL Card purchase $73.97\n").unwrap();

    penny(home.path())
        .arg("parse")
        .arg(&file)
        .arg("--screenshot")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 rows via chase_dashboard"));

    penny(home.path())
        .arg("parse")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("via generic"));
}
