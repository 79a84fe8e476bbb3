//! Exit status of the `gauntlet` binary for setup and configuration failures

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn gauntlet(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gauntlet"))
        .arg("--root")
        .arg(root)
        .args(args)
        .env("RUST_LOG", "error")
        .output()
        .expect("failed to run gauntlet")
}

fn app_with_tests() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let unit = tmp.path().join("test/unit");
    std::fs::create_dir_all(&unit).unwrap();
    std::fs::write(unit.join("cart_test.js"), "ok(true);").unwrap();
    tmp
}

#[test]
fn list_succeeds_with_default_config() {
    let app = app_with_tests();

    let output = gauntlet(app.path(), &["list", "--format", "json"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("test/unit/cart_test.js"));
}

#[test]
fn malformed_config_exits_with_setup_status() {
    let app = app_with_tests();
    std::fs::write(app.path().join("gauntlet.toml"), "[app]\nsite_dir = 5\n").unwrap();

    let output = gauntlet(app.path(), &["list"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to load configuration"));
}

#[test]
fn missing_root_exits_with_setup_status() {
    let tmp = TempDir::new().unwrap();

    let output = gauntlet(&tmp.path().join("nowhere"), &["list"]);

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn invalid_glob_exits_with_setup_status() {
    let app = app_with_tests();

    let output = gauntlet(app.path(), &["list", "test/[unit"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid glob"));
}

#[test]
fn empty_compiler_command_exits_with_setup_status() {
    let app = app_with_tests();
    std::fs::write(
        app.path().join("gauntlet.toml"),
        "[pipeline]\ncompiler = []\n",
    )
    .unwrap();

    let output = gauntlet(app.path(), &["test", "--dry-run"]);

    assert_eq!(output.status.code(), Some(2));
}
