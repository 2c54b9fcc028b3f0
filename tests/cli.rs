use std::process::Command;

fn lode(dir: &std::path::Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_lode"))
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap()
}

#[test]
fn stats_on_fresh_database_is_empty() {
    let dir = tempfile::tempdir().unwrap();

    let output = lode(dir.path(), &["stats", "--format", "json"]);
    assert!(
        output.status.success(),
        "lode stats failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stats: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stats output should be JSON");
    assert_eq!(stats["totalChunks"], 0);
    assert_eq!(stats["totalFiles"], 0);
    assert_eq!(stats["totalRepositories"], 0);
}

#[test]
fn related_for_unindexed_file_reports_empty() {
    let dir = tempfile::tempdir().unwrap();

    let output = lode(
        dir.path(),
        &["related", "src/never_indexed.py", "--format", "json"],
    );
    assert!(
        output.status.success(),
        "lode related failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let related: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(related, serde_json::json!([]));
}

#[test]
fn delete_unknown_repository_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();

    let output = lode(dir.path(), &["delete", "ghost", "--format", "json"]);
    assert!(
        output.status.success(),
        "lode delete failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["deletedChunks"], 0);
}

#[test]
fn index_requires_an_api_key() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("app.py"), "def handler(event): pass\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_lode"))
        .args(["index", "--path", "."])
        .current_dir(dir.path())
        .env_remove("LODESTONE_API_KEY")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("API key"),
        "error should mention the missing API key: {stderr}"
    );
}

#[test]
fn help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();

    let output = lode(dir.path(), &["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for subcommand in ["index", "search", "related", "stats", "delete", "init"] {
        assert!(stdout.contains(subcommand), "help should list {subcommand}");
    }
}
