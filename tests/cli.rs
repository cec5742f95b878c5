//! Integration tests for top-level CLI behavior.
//!
//! Each test runs the binary against its own temp data directory via the
//! `TRACELINK_DIR` environment variable; nothing here touches the network.

use std::path::{Path, PathBuf};
use std::process::Command;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tracelink_cli_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn run_in(dir: &Path, args: &[&str]) -> std::process::Output {
    let bin = env!("CARGO_BIN_EXE_tracelink");
    Command::new(bin)
        .env("TRACELINK_DIR", dir)
        .args(args)
        .output()
        .expect("failed to run tracelink binary")
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn unknown_subcommand_fails() {
    let dir = temp_dir("unknown");
    let output = run_in(&dir, &["frobnicate"]);
    assert!(!output.status.success());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn project_list_empty_store() {
    let dir = temp_dir("empty_projects");
    let output = run_in(&dir, &["project", "list"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No projects yet"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn project_and_task_creation_flow() {
    let dir = temp_dir("create_flow");

    let output = run_in(&dir, &["project", "add", "Demo"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("PROJ-001"));

    let output = run_in(&dir, &["task", "add", "PROJ-001", "Ship the parser"]);
    assert!(output.status.success());
    // New tasks land in the default workflow's first stage.
    assert!(stdout(&output).contains("TASK-001"));
    assert!(stdout(&output).contains("[todo]"));

    let output = run_in(&dir, &["task", "list", "PROJ-001"]);
    assert!(stdout(&output).contains("Ship the parser"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn manual_link_survives_in_links_listing() {
    let dir = temp_dir("link_flow");
    run_in(&dir, &["project", "add", "Demo"]);
    run_in(&dir, &["task", "add", "PROJ-001", "First"]);

    let output = run_in(&dir, &["link", "branch", "TASK-001", "org/repo", "feature-x"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = run_in(&dir, &["links", "TASK-001"]);
    let text = stdout(&output);
    assert!(text.contains("org/repo@feature-x"));
    assert!(text.contains("source=manual"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn unlink_is_idempotent_at_the_cli() {
    let dir = temp_dir("unlink_twice");
    run_in(&dir, &["project", "add", "Demo"]);
    run_in(&dir, &["task", "add", "PROJ-001", "First"]);
    run_in(&dir, &["link", "branch", "TASK-001", "org/repo", "main"]);

    assert!(run_in(&dir, &["unlink", "branch", "TASK-001", "org/repo", "main"]).status.success());
    assert!(run_in(&dir, &["unlink", "branch", "TASK-001", "org/repo", "main"]).status.success());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn link_rejects_malformed_repository() {
    let dir = temp_dir("bad_repo");
    run_in(&dir, &["project", "add", "Demo"]);
    run_in(&dir, &["task", "add", "PROJ-001", "First"]);

    let output = run_in(&dir, &["link", "branch", "TASK-001", "norepo", "main"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid input"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn progress_tracks_task_stages() {
    let dir = temp_dir("progress");
    run_in(&dir, &["project", "add", "Demo"]);
    for title in ["A", "B", "C", "D"] {
        run_in(&dir, &["task", "add", "PROJ-001", title]);
    }
    run_in(&dir, &["task", "move", "TASK-002", "in_progress"]);
    run_in(&dir, &["task", "move", "TASK-003", "done"]);
    run_in(&dir, &["task", "move", "TASK-004", "done"]);

    let output = run_in(&dir, &["progress", "PROJ-001"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("50% complete"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn workflow_define_from_yaml_file() {
    let dir = temp_dir("workflow_define");
    run_in(&dir, &["project", "add", "Demo"]);

    let stages = "\
- id: queued
  name: Queued
  color: \"#6b7280\"
  class: not_started
- id: shipped
  name: Shipped
  color: \"#22c55e\"
  class: completed
";
    let file = dir.join("stages.yaml");
    std::fs::write(&file, stages).unwrap();

    let output =
        run_in(&dir, &["workflow", "define", "PROJ-001", "--file", file.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = run_in(&dir, &["workflow", "show", "PROJ-001"]);
    let text = stdout(&output);
    assert!(text.contains("queued"));
    assert!(text.contains("shipped"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn workflow_define_rejects_orphaning_tasks() {
    let dir = temp_dir("workflow_orphan");
    run_in(&dir, &["project", "add", "Demo"]);
    run_in(&dir, &["task", "add", "PROJ-001", "Stuck"]);

    // The default workflow puts the task in "todo"; this file drops it.
    let file = dir.join("stages.yaml");
    std::fs::write(&file, "- id: done\n  name: Done\n  color: \"#fff\"\n  class: completed\n")
        .unwrap();

    let output =
        run_in(&dir, &["workflow", "define", "PROJ-001", "--file", file.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("conflict"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_attach_and_show() {
    let dir = temp_dir("version_flow");
    run_in(&dir, &["project", "add", "Demo"]);
    run_in(&dir, &["version", "add", "PROJ-001", "1.0.0"]);

    let output = run_in(&dir, &["version", "attach", "VER-001", "org/repo", "abc1234def"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = run_in(&dir, &["version", "show", "VER-001"]);
    let text = stdout(&output);
    assert!(text.contains("1 commits"));
    assert!(text.contains("abc1234def"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn links_for_missing_task_fails() {
    let dir = temp_dir("missing_task");
    let output = run_in(&dir, &["links", "TASK-404"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
    let _ = std::fs::remove_dir_all(&dir);
}
