//! Command-line behaviour of the `camroll` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn iphone_mount() -> TempDir {
    let mount = TempDir::new().expect("create mount tempdir");
    let roll = mount.path().join("Internal Storage/DCIM/100APPLE");
    fs::create_dir_all(&roll).expect("create roll");
    fs::write(roll.join("IMG_0001.JPG"), b"jpeg-bytes").expect("write jpg");
    fs::write(roll.join("VID_0002.MOV"), b"movie-bytes").expect("write mov");
    mount
}

fn camroll() -> Command {
    Command::cargo_bin("camroll").expect("camroll binary")
}

/// The single dated folder a run created under `dest`
fn run_folder(dest: &Path) -> PathBuf {
    let folders: Vec<PathBuf> = fs::read_dir(dest)
        .expect("read dest")
        .map(|e| e.expect("dest entry").path())
        .collect();
    assert_eq!(folders.len(), 1, "expected one dated folder: {:?}", folders);
    folders.into_iter().next().expect("dated folder")
}

#[test]
fn test_help_lists_core_flags() {
    camroll()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--mount"))
        .stdout(predicate::str::contains("--checksum"))
        .stdout(predicate::str::contains("--no-delete"));
}

#[test]
fn test_unknown_device_type_rejected() {
    camroll()
        .args(["--device", "blackberry"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("blackberry"));
}

#[test]
fn test_missing_mount_point_fails() {
    let dest = TempDir::new().expect("create dest tempdir");
    camroll()
        .arg("--dest")
        .arg(dest.path())
        .args(["--device", "iphone", "--yes", "--no-delete"])
        .arg("--mount")
        .arg(dest.path().join("not-mounted"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Mount point does not exist"));
}

#[test]
fn test_copy_without_delete() {
    let mount = iphone_mount();
    let dest = TempDir::new().expect("create dest tempdir");

    camroll()
        .arg("--dest")
        .arg(dest.path())
        .arg("--mount")
        .arg(mount.path())
        .args(["--device", "iphone", "--yes", "--no-delete", "--no-throughput"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Summary"))
        .stdout(predicate::str::contains("Originals left on the device"));

    let folder = run_folder(dest.path());
    assert_eq!(
        fs::read(folder.join("VID_0002.MOV")).expect("read copy"),
        b"movie-bytes"
    );
    assert!(mount
        .path()
        .join("Internal Storage/DCIM/100APPLE/VID_0002.MOV")
        .exists());
}

#[test]
fn test_json_summary_and_delete() {
    let mount = iphone_mount();
    let dest = TempDir::new().expect("create dest tempdir");

    let output = camroll()
        .arg("--dest")
        .arg(dest.path())
        .arg("--mount")
        .arg(mount.path())
        .args(["--device", "iphone", "--yes", "--delete", "--checksum", "--json"])
        .output()
        .expect("run camroll");
    assert!(output.status.success());

    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(summary["copied"], 2);
    assert_eq!(summary["verified"], 2);
    assert_eq!(summary["deleted"], 2);
    assert_eq!(summary["state"], "done");

    assert!(!mount
        .path()
        .join("Internal Storage/DCIM/100APPLE/IMG_0001.JPG")
        .exists());
}

#[test]
fn test_config_file_supplies_defaults() {
    let mount = iphone_mount();
    let dest = TempDir::new().expect("create dest tempdir");
    let config_dir = TempDir::new().expect("create config tempdir");
    let config_path = config_dir.path().join("camroll.toml");
    fs::write(
        &config_path,
        format!(
            "destination = {:?}\ndevice = \"iphone\"\nmount = {:?}\nextensions = [\"mov\"]\n",
            dest.path(),
            mount.path()
        ),
    )
    .expect("write config");

    camroll()
        .arg("--config")
        .arg(&config_path)
        .args(["--yes", "--no-delete"])
        .assert()
        .success();

    let folder = run_folder(dest.path());
    assert!(folder.join("VID_0002.MOV").exists());
    assert!(!folder.join("IMG_0001.JPG").exists());
}

#[test]
fn test_second_run_skips_existing_copies() {
    let mount = iphone_mount();
    let dest = TempDir::new().expect("create dest tempdir");
    let args = |cmd: &mut Command| {
        cmd.arg("--dest")
            .arg(dest.path())
            .arg("--mount")
            .arg(mount.path())
            .args(["--device", "iphone", "--yes", "--no-delete", "--json"]);
    };

    let mut first = camroll();
    args(&mut first);
    first.assert().success();

    let mut second = camroll();
    args(&mut second);
    let output = second.output().expect("run camroll");
    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(summary["copied"], 0);
    assert_eq!(summary["skipped"], 2);
}
