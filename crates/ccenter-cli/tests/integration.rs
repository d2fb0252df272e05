#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ccenter(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ccenter").unwrap();
    cmd.current_dir(dir.path()).env("CCENTER_ROOT", dir.path());
    cmd
}

fn write_skill(dir: &TempDir) {
    let skills = dir.path().join(".ccenter/skills");
    std::fs::create_dir_all(&skills).unwrap();
    std::fs::write(
        skills.join("deploy.yaml"),
        "name: deploy\ndescription: Build and ship\nsteps:\n  - name: build\n  - name: test\n  - name: ship\n",
    )
    .unwrap();
}

const LOG: &str = r#"# deploy runs and finishes
{"event":"started","job_name":"deploy","execution_id":"ws-1","total_steps":3}

{"event":"completed","execution_id":"ws-1","success":true}
{"event":"advance","millis":5000}
"#;

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_init_creates_files() {
    let dir = TempDir::new().unwrap();
    ccenter(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    assert!(dir.path().join(".ccenter/config.yaml").exists());
    assert!(dir.path().join(".ccenter/skills").is_dir());
}

#[test]
fn config_init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    ccenter(&dir).args(["config", "init"]).assert().success();
    ccenter(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn config_validate_passes_on_defaults() {
    let dir = TempDir::new().unwrap();
    ccenter(&dir).args(["config", "init"]).assert().success();
    ccenter(&dir).args(["config", "validate"]).assert().success();
}

#[test]
fn config_validate_without_init_fails() {
    let dir = TempDir::new().unwrap();
    ccenter(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn config_validate_reports_errors() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".ccenter")).unwrap();
    std::fs::write(
        dir.path().join(".ccenter/config.yaml"),
        "reconciler:\n  stale_after_minutes: 0\n",
    )
    .unwrap();
    ccenter(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"));
}

#[test]
fn config_show_json() {
    let dir = TempDir::new().unwrap();
    let output = ccenter(&dir)
        .args(["--json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["server"]["port"], 3171);
    assert_eq!(value["reconciler"]["dedup_window_ms"], 2000);
}

// ---------------------------------------------------------------------------
// skills
// ---------------------------------------------------------------------------

#[test]
fn skills_list_shows_definitions() {
    let dir = TempDir::new().unwrap();
    write_skill(&dir);
    ccenter(&dir)
        .args(["skills", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("Build and ship"));
}

#[test]
fn skills_show_unknown_fails() {
    let dir = TempDir::new().unwrap();
    ccenter(&dir)
        .args(["skills", "show", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost"));
}

// ---------------------------------------------------------------------------
// replay
// ---------------------------------------------------------------------------

#[test]
fn replay_prints_decisions() {
    let dir = TempDir::new().unwrap();
    write_skill(&dir);
    let log = dir.path().join("session.jsonl");
    std::fs::write(&log, LOG).unwrap();

    ccenter(&dir)
        .args(["replay", log.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("REDRAW"))
        .stdout(predicate::str::contains("ws-1@+5000ms"))
        .stdout(predicate::str::contains("No running executions."));
}

#[test]
fn replay_json_reports_final_state() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("session.jsonl");
    std::fs::write(&log, LOG).unwrap();

    let output = ccenter(&dir)
        .args(["--json", "replay", log.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let decisions = value["decisions"].as_array().unwrap();
    assert_eq!(decisions.len(), 3);
    assert_eq!(decisions[0]["input"], "started");
    assert_eq!(decisions[0]["line"], 2);
    assert_eq!(decisions[1]["removals"][0]["execution_id"], "ws-1");
    assert_eq!(value["running"], serde_json::json!([]));
    assert_eq!(value["clock_millis"], 5000);
}

#[test]
fn replay_bad_line_names_the_line() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("broken.jsonl");
    std::fs::write(&log, "{\"event\":\"refresh\"}\n{\"event\":\"explode\"}\n").unwrap();

    ccenter(&dir)
        .args(["replay", log.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

#[test]
fn status_against_unreachable_server_fails() {
    let dir = TempDir::new().unwrap();
    ccenter(&dir)
        .args(["status", "--url", "http://127.0.0.1:1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not reach"));
}
