//! End-to-end tests driving the built binary over piped stdin, the same
//! way `db > ` sessions are driven in practice.

use std::io::Write;
use std::process::{Command, Stdio};

use tempfile::NamedTempFile;

fn run(db_path: &std::path::Path, input: &str) -> String {
    let mut child = Command::new(env!("CARGO_BIN_EXE_leafdb"))
        .arg(db_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to start leafdb");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();

    let output = child.wait_with_output().unwrap();
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn insert_and_select_round_trip() {
    let file = NamedTempFile::new().unwrap();
    let output = run(
        file.path(),
        "insert 1 cstack foo@bar.com\nselect\n.exit\n",
    );
    assert!(output.contains("(1 cstack foo@bar.com)"));
    assert!(output.contains("Bye~"));
}

#[test]
fn fourteen_inserts_split_the_root_and_preserve_order() {
    let file = NamedTempFile::new().unwrap();
    let mut script = String::new();
    for id in 1..=14 {
        script.push_str(&format!("insert {id} user{id} user{id}@email.com\n"));
    }
    script.push_str("select\n.btree\n.exit\n");

    let output = run(file.path(), &script);
    let select_pos = output.find("(1 user1").unwrap();
    let btree_pos = output.find("internal (size 1)").unwrap();
    assert!(select_pos < btree_pos);
    assert!(output.contains("- leaf (size 7)"));
    assert!(output.matches("leaf (size 7)").count() == 2);
}

#[test]
fn reopen_after_exit_preserves_rows() {
    let file = NamedTempFile::new().unwrap();
    run(file.path(), "insert 1 a a@b.com\ninsert 2 b b@c.com\n.exit\n");
    let output = run(file.path(), "select\n.exit\n");
    assert!(output.contains("(1 a a@b.com)"));
    assert!(output.contains("(2 b b@c.com)"));
}

#[test]
fn duplicate_insert_is_rejected_without_corrupting_state() {
    let file = NamedTempFile::new().unwrap();
    let output = run(
        file.path(),
        "insert 1 a a@b.com\ninsert 1 b b@c.com\nselect\n.exit\n",
    );
    assert!(output.contains("Error: Duplicate key."));
    assert_eq!(output.matches("(1 ").count(), 1);
}

#[test]
fn overlong_username_is_rejected_with_exact_message() {
    let file = NamedTempFile::new().unwrap();
    let long_username = "a".repeat(33);
    let output = run(
        file.path(),
        &format!("insert 1 {long_username} user@email.com\n.exit\n"),
    );
    assert!(output.contains("String is too long"));
}

#[test]
fn negative_id_is_rejected_with_exact_message() {
    let file = NamedTempFile::new().unwrap();
    let output = run(file.path(), "insert -1 user user@email.com\n.exit\n");
    assert!(output.contains("ID must be positive"));
}

#[test]
fn missing_db_path_reports_the_classic_message() {
    let output = Command::new(env!("CARGO_BIN_EXE_leafdb"))
        .output()
        .expect("failed to start leafdb");
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Must supply a database filename"));
}
