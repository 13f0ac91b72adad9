// Black-box CLI checks through the built binary. Every invocation pins the
// config with --config so no test touches the user's real config directory.

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const JPEG_MAGIC: [u8; 8] = [0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F'];

fn write_minimal_config(dir: &Path) -> PathBuf {
    let path = dir.join("config.xml");
    fs::write(&path, "<config><log_level>quiet</log_level></config>").unwrap();
    path
}

fn filedog() -> Command {
    Command::cargo_bin("filedog").unwrap()
}

fn run(cmd: &mut Command) -> (bool, String, String) {
    let out = cmd.output().unwrap();
    (
        out.status.success(),
        String::from_utf8_lossy(&out.stdout).into_owned(),
        String::from_utf8_lossy(&out.stderr).into_owned(),
    )
}

#[test]
fn help_lists_subcommands() {
    let (ok, stdout, _) = run(filedog().arg("--help"));
    assert!(ok);
    assert!(stdout.contains("organize"));
    assert!(stdout.contains("watch"));
    assert!(stdout.contains("print-config"));
}

#[test]
fn organize_sorts_a_directory() {
    let td = tempdir().unwrap();
    let cfg = write_minimal_config(td.path());
    let target = td.path().join("inbox");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("photo.jpg"), JPEG_MAGIC).unwrap();
    fs::write(target.join("notes.txt"), b"some words").unwrap();

    let (ok, stdout, stderr) = run(filedog()
        .args(["organize", "-v"])
        .arg(&target)
        .arg("--config")
        .arg(&cfg));
    assert!(ok, "stderr: {stderr}");
    assert!(stdout.contains("2 moved"), "stdout: {stdout}");

    assert!(target.join("Images").join("photo.jpg").exists());
    assert!(target.join("Documents").join("notes.txt").exists());
}

#[test]
fn organize_dry_run_changes_nothing() {
    let td = tempdir().unwrap();
    let cfg = write_minimal_config(td.path());
    let target = td.path().join("inbox");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("photo.jpg"), JPEG_MAGIC).unwrap();

    let (ok, stdout, _) = run(filedog()
        .args(["organize", "--dry-run"])
        .arg(&target)
        .arg("--config")
        .arg(&cfg));
    assert!(ok);
    assert!(stdout.contains("Dry-run"), "stdout: {stdout}");

    assert!(target.join("photo.jpg").exists());
    assert!(!target.join("Images").exists());
}

#[test]
fn organize_missing_directory_fails() {
    let td = tempdir().unwrap();
    let cfg = write_minimal_config(td.path());

    let (ok, _, _) = run(filedog()
        .arg("organize")
        .arg(td.path().join("no-such-dir"))
        .arg("--config")
        .arg(&cfg));
    assert!(!ok);
}

#[test]
fn watch_add_status_remove_round_trip() {
    let td = tempdir().unwrap();
    let cfg = write_minimal_config(td.path());
    let watched = td.path().join("inbox");
    fs::create_dir(&watched).unwrap();

    let (ok, _, stderr) = run(filedog()
        .args(["watch", "add"])
        .arg(&watched)
        .arg("--config")
        .arg(&cfg));
    assert!(ok, "stderr: {stderr}");

    let (ok, stdout, _) = run(filedog().args(["watch", "status", "--config"]).arg(&cfg));
    assert!(ok);
    assert!(stdout.contains("enabled"), "stdout: {stdout}");
    assert!(stdout.contains("inbox"), "stdout: {stdout}");

    let (ok, _, _) = run(filedog()
        .args(["watch", "disable"])
        .arg(&watched)
        .arg("--config")
        .arg(&cfg));
    assert!(ok);

    let (ok, stdout, _) = run(filedog().args(["watch", "status", "--config"]).arg(&cfg));
    assert!(ok);
    assert!(stdout.contains("disabled"), "stdout: {stdout}");

    let (ok, _, _) = run(filedog()
        .args(["watch", "remove"])
        .arg(&watched)
        .arg("--config")
        .arg(&cfg));
    assert!(ok);
}

#[test]
fn watch_add_rejects_non_directories() {
    let td = tempdir().unwrap();
    let cfg = write_minimal_config(td.path());
    let file = td.path().join("plain.txt");
    fs::write(&file, b"x").unwrap();

    let (ok, _, _) = run(filedog()
        .args(["watch", "add"])
        .arg(&file)
        .arg("--config")
        .arg(&cfg));
    assert!(!ok);
}

#[test]
fn watch_start_refuses_empty_watch_list() {
    let td = tempdir().unwrap();
    let cfg = write_minimal_config(td.path());

    let (ok, _, stderr) = run(filedog().args(["watch", "start", "--config"]).arg(&cfg));
    assert!(!ok);
    assert!(
        stderr.contains("no enabled watch directories"),
        "stderr: {stderr}"
    );
}

#[test]
fn print_config_reports_explicit_path() {
    let td = tempdir().unwrap();
    let cfg = write_minimal_config(td.path());

    let (ok, stdout, _) = run(filedog().args(["print-config", "--config"]).arg(&cfg));
    assert!(ok);
    assert!(stdout.contains("config.xml"), "stdout: {stdout}");
}

#[test]
fn malformed_config_is_a_hard_failure() {
    let td = tempdir().unwrap();
    let cfg = td.path().join("config.xml");
    fs::write(&cfg, "<config><rule><match>image/</match></config>").unwrap();
    let target = td.path().join("inbox");
    fs::create_dir(&target).unwrap();

    let (ok, _, _) = run(filedog()
        .arg("organize")
        .arg(&target)
        .arg("--config")
        .arg(&cfg));
    assert!(!ok);
}
