use assert_cmd::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

fn has_git() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn git(dir: &Path, args: &[&str]) {
    assert!(Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

fn init_git_repo(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "--quiet"]);
    git(dir, &["config", "core.autocrlf", "false"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
    git(dir, &["config", "user.email", "you@example.com"]);
    git(dir, &["config", "user.name", "Your Name"]);
}

fn commit_file(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut f = File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.sync_all().unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "--quiet", "-m", &format!("add {name}")]);
}

/// Writes a config pointing at `source` and returns its path.
fn write_config(root: &Path, source: &Path) -> PathBuf {
    let out = root.join("out");
    let config = format!(
        r#"
repositories:
  - name: sample
    url: "{source}"
users:
  - name: you
    associations: [you@example.com]
teams:
  - name: core
    users: [you]
tmpDir: "{tmp}"
statsDir: "{stats}"
reportCalendarUser:
  - user: you
    output: "{out}/calendar.json"
reportDonutUser:
  - output: "{out}/donut.json"
    color: "rgb(10, 20, 30)"
"#,
        source = source.display(),
        tmp = root.join("work").display(),
        stats = root.join("stats").display(),
        out = out.display(),
    );
    let path = root.join("gteam.yml");
    fs::write(&path, config).unwrap();
    path
}

fn gteam(config: &Path, args: &[&str]) -> Vec<u8> {
    let mut cmd = Command::cargo_bin("gteam").unwrap();
    cmd.arg("--config").arg(config).args(args);
    cmd.assert().success().get_output().stdout.clone()
}

fn snapshot_count(stats: &Path) -> usize {
    fs::read_dir(stats)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".stats.json"))
        .count()
}

#[test]
fn collect_then_report_writes_render_inputs() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    let source = dir.path().join("source");
    init_git_repo(&source);
    commit_file(&source, "src/a.rs", "fn a(){}\n");
    commit_file(&source, "src/b.rs", "fn b(){}\n");
    let config = write_config(dir.path(), &source);

    gteam(&config, &["collect"]);
    assert_eq!(snapshot_count(&dir.path().join("stats")), 1);

    gteam(&config, &["report"]);
    let calendar: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("out/calendar.json")).unwrap()).unwrap();
    assert_eq!(calendar["kind"], "calendarUser");
    assert_eq!(calendar["data"]["total"], 2.0);

    let donut: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("out/donut.json")).unwrap()).unwrap();
    assert_eq!(donut["options"]["color"], "rgb(10, 20, 30)");
    assert_eq!(donut["data"]["shares"][0]["key"], "you");
    assert_eq!(donut["data"]["shares"][0]["share"], 1.0);
}

#[test]
fn summary_json_totals_per_user_and_team() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    let source = dir.path().join("source");
    init_git_repo(&source);
    commit_file(&source, "lib.rs", "pub fn hi(){}\n");
    commit_file(&source, "lib.rs", "pub fn hi(){ println!(\"hi\"); }\n");
    let config = write_config(dir.path(), &source);
    gteam(&config, &["collect"]);

    let out = gteam(&config, &["summary", "--json"]);
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["by"], "user");
    assert_eq!(v["entries"][0]["key"], "you");
    // one added line, then one line replaced
    assert_eq!(v["entries"][0]["value"], 3.0);

    let out = gteam(&config, &["summary", "--json", "--teams"]);
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["entries"][0]["key"], "core");
    assert_eq!(v["total"], 3.0);
}

#[test]
fn gc_removes_superseded_snapshots() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    let source = dir.path().join("source");
    init_git_repo(&source);
    commit_file(&source, "README.md", "hello\n");
    let config = write_config(dir.path(), &source);
    let stats = dir.path().join("stats");

    gteam(&config, &["collect"]);
    std::thread::sleep(std::time::Duration::from_millis(20));
    commit_file(&source, "README.md", "hello\nworld\n");
    gteam(&config, &["collect", "--keep-stale"]);
    assert_eq!(snapshot_count(&stats), 2);

    gteam(&config, &["gc", "--dry-run"]);
    assert_eq!(snapshot_count(&stats), 2);

    gteam(&config, &["gc"]);
    assert_eq!(snapshot_count(&stats), 1);

    let out = gteam(&config, &["summary", "--json"]);
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["total"], 2.0);
}

#[test]
fn missing_config_is_fatal() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("gteam").unwrap();
    cmd.arg("--config").arg(dir.path().join("absent.yml")).arg("summary");
    cmd.assert().failure();
}
