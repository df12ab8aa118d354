// Integration tests for the omadactl command surface

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn ssid_command_accepts_target_override() {
    let mut cmd = cargo_bin_cmd!("omadactl");
    cmd.args(["ssid", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("--ssid"))
        .stdout(predicates::str::contains("list"))
        .stdout(predicates::str::contains("disable"));
}

#[test]
fn unknown_actions_are_rejected() {
    for args in [["ssid", "reboot"], ["wifi", "list"]] {
        let mut cmd = cargo_bin_cmd!("omadactl");
        cmd.args(args);
        cmd.assert()
            .failure()
            .stderr(predicates::str::contains("invalid value"));
    }
}

#[test]
fn missing_configuration_exits_with_one() {
    let dir = tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("omadactl");
    cmd.current_dir(dir.path())
        .env("OMADACTL_CONFIG_DIR", dir.path().join("config"))
        .env_remove("RUST_LOG")
        .args(["ssid", "list"]);
    cmd.assert()
        .code(1)
        .stderr(predicates::str::contains("host/username/password are required"));
}

#[test]
fn wifi_requires_original_ssid() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join(".omadactl.yaml"),
        "host: 127.0.0.1\nusername: admin\npassword: secret\n",
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("omadactl");
    cmd.current_dir(dir.path())
        .env("OMADACTL_CONFIG_DIR", dir.path().join("config"))
        .env_remove("RUST_LOG")
        .args(["wifi", "disable"]);
    cmd.assert()
        .code(1)
        .stderr(predicates::str::contains("original_ssid is required"));
}

#[test]
fn configure_then_show_masks_password() {
    let dir = tempdir().unwrap();

    let mut configure = cargo_bin_cmd!("omadactl");
    configure
        .current_dir(dir.path())
        .env("OMADACTL_CONFIG_DIR", dir.path().join("config"))
        .args([
            "--host",
            "omada.lan",
            "configure",
            "--username",
            "admin",
            "--password",
            "hunter2",
            "--default-ssid",
            "Guest",
        ]);
    configure
        .assert()
        .success()
        .stdout(predicates::str::contains("Saved controller settings"));

    let mut show = cargo_bin_cmd!("omadactl");
    show.current_dir(dir.path())
        .env("OMADACTL_CONFIG_DIR", dir.path().join("config"))
        .arg("config-show");
    show.assert()
        .success()
        .stdout(predicates::str::contains("omada.lan"))
        .stdout(predicates::str::contains("*****"))
        .stdout(predicates::str::contains("hunter2").not());
}

#[test]
fn completion_script_is_generated() {
    let mut cmd = cargo_bin_cmd!("omadactl");
    cmd.args(["completion", "bash"]);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("omadactl"));
}
