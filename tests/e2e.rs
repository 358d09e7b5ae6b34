use assert_cmd::prelude::*;
use predicates::prelude::*;
use rusqlite::Connection;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn write_dump(path: &Path, lines: &[&str]) {
    let mut f = fs::File::create(path).unwrap();
    for line in lines {
        writeln!(f, "{line}").unwrap();
    }
}

fn import_cmd(db: &Path, dump: &Path) -> Command {
    import_cmd_dated(db, dump, "2023-03-01")
}

fn import_cmd_dated(db: &Path, dump: &Path, share_date: &str) -> Command {
    let mut cmd = Command::cargo_bin("leakdb-import").unwrap();
    cmd.env_remove("LEAKDB_NOTIFY_URL")
        .arg("--database-path")
        .arg(db)
        .arg("--leak-path")
        .arg(dump)
        .args(["-c", "forum breach", "--share-date", share_date])
        .args(["-l", "l33t,crew", "-p", "forum,mail", "--color", "never"]);
    cmd
}

fn count(db: &Path, table: &str) -> i64 {
    let conn = Connection::open(db).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        .unwrap()
}

#[test]
fn imports_dump_and_prints_summary() {
    let tmp = tempdir().unwrap();
    let dump = tmp.path().join("dump.txt");
    let db = tmp.path().join("leaks.sqlite");
    write_dump(
        &dump,
        &[
            "alice@example.com:hunter2",
            "bob@example.com:hunter2",
            "carol@example.com:pa:ss",
        ],
    );

    import_cmd(&db, &dump)
        .assert()
        .success()
        .stdout(predicate::str::contains("Import Summary"))
        .stdout(predicate::str::contains("Affected Users: 3"))
        .stdout(predicate::str::contains("hunter2: 2"));

    assert_eq!(count(&db, "User"), 3);
    assert_eq!(count(&db, "Credentials"), 2);
    assert_eq!(count(&db, "Leak"), 1);
    assert_eq!(count(&db, "Platform"), 2);
    assert_eq!(count(&db, "BadActor"), 2);
    assert_eq!(count(&db, "LeakUser"), 3);
    assert_eq!(count(&db, "UserCredentials"), 3);
    assert_eq!(count(&db, "LeakPlatform"), 2);
    assert_eq!(count(&db, "LeakBadActor"), 2);
}

#[test]
fn reimport_reuses_primary_rows() {
    let tmp = tempdir().unwrap();
    let dump = tmp.path().join("dump.txt");
    let db = tmp.path().join("leaks.sqlite");
    write_dump(&dump, &["a@x.com,one", "b@x.com,two"]);

    import_cmd(&db, &dump).arg("-q").assert().success();
    import_cmd(&db, &dump).arg("-q").assert().success();

    assert_eq!(count(&db, "User"), 2);
    assert_eq!(count(&db, "Leak"), 1);
    assert_eq!(count(&db, "LeakUser"), 4);
}

#[test]
fn empty_dump_is_a_fatal_parse_error() {
    let tmp = tempdir().unwrap();
    let dump = tmp.path().join("empty.txt");
    fs::File::create(&dump).unwrap();
    import_cmd(&tmp.path().join("leaks.sqlite"), &dump)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("empty"));
}

#[test]
fn missing_leak_file_causes_non_zero_exit() {
    let tmp = tempdir().unwrap();
    import_cmd(&tmp.path().join("leaks.sqlite"), &tmp.path().join("missing.txt"))
        .assert()
        .code(2);
}

#[test]
fn invalid_share_date_is_rejected_before_parsing() {
    let tmp = tempdir().unwrap();
    let dump = tmp.path().join("dump.txt");
    let db = tmp.path().join("leaks.sqlite");
    write_dump(&dump, &["a@x.com:one"]);
    import_cmd_dated(&db, &dump, "01/03/2023")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("share-date"));
    assert!(!db.exists());
}

#[test]
fn declining_the_prompt_stores_nothing() {
    let tmp = tempdir().unwrap();
    let dump = tmp.path().join("dump.txt");
    let db = tmp.path().join("leaks.sqlite");
    write_dump(&dump, &["a@x.com:one", "garbage"]);
    assert_cmd::Command::from_std(import_cmd(&db, &dump))
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Proceed with import?"))
        .stdout(predicate::str::contains("Import cancelled."));
    assert!(!db.exists());
}

#[test]
fn skip_interactive_imports_valid_lines_and_exports_rejects() {
    let tmp = tempdir().unwrap();
    let dump = tmp.path().join("dump.txt");
    let db = tmp.path().join("leaks.sqlite");
    let rejected = tmp.path().join("rejected.csv");
    write_dump(
        &dump,
        &["a@x.com;one", "garbage", "b@x.com;two", "not-an-email;x"],
    );
    import_cmd(&db, &dump)
        .arg("-y")
        .arg("--errors-out")
        .arg(&rejected)
        .assert()
        .success()
        .stdout(predicate::str::contains("Rejected Lines: 2"));

    assert_eq!(count(&db, "User"), 2);
    let csv = fs::read_to_string(&rejected).unwrap();
    assert!(csv.starts_with("line,error\n"));
    assert!(csv.contains("\n2,"));
    assert!(csv.contains("\n4,"));
}

#[test]
fn unreachable_webhook_exits_after_commit() {
    let tmp = tempdir().unwrap();
    let dump = tmp.path().join("dump.txt");
    let db = tmp.path().join("leaks.sqlite");
    write_dump(&dump, &["a@x.com:one"]);
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    // five attempts with a three second pause between them
    import_cmd(&db, &dump)
        .arg("-q")
        .arg("--notify-url")
        .arg(format!("http://127.0.0.1:{port}/leaks"))
        .assert()
        .code(6);
    assert_eq!(count(&db, "Leak"), 1);
}
