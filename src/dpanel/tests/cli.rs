use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const UNREACHABLE: &str = "http://127.0.0.1:9";

fn dpid(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dpid").unwrap();
    cmd.env("HOME", home.path())
        .env("DPANEL_API_BASE_URL", UNREACHABLE)
        .env("DNOCS_TUNNEL_RELEASE_URL", format!("{}/releases/latest", UNREACHABLE))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn version() {
    let home = TempDir::new().unwrap();

    dpid(&home)
        .arg("version")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn info() {
    let home = TempDir::new().unwrap();

    dpid(&home)
        .arg("info")
        .assert()
        .success()
        .stdout(contains("Your System Information"))
        .stdout(contains(std::env::consts::OS))
        .stdout(contains(std::env::consts::ARCH));
}

#[test]
fn help_lists_commands() {
    let home = TempDir::new().unwrap();

    dpid(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("register"))
        .stdout(contains("machine"))
        .stdout(contains("tunnel"));
}

#[test]
fn log_file_is_created_in_the_devetek_dir() {
    let home = TempDir::new().unwrap();

    dpid(&home).arg("version").assert().success();

    assert!(home.path().join(".devetek").join("dpid.log").exists());
}

#[test]
fn tunnel_create_requires_a_session() {
    let home = TempDir::new().unwrap();

    dpid(&home)
        .args([
            "tunnel",
            "create",
            "--tunnel-ssh-listener",
            "2222",
            "--tunnel-http-listener",
            "8080",
        ])
        .assert()
        .failure()
        .stderr(contains("[ERROR]"))
        .stderr(contains("dpid auth login"));
}

#[test]
fn tunnel_upgrade_requires_a_session() {
    let home = TempDir::new().unwrap();

    dpid(&home)
        .args(["tunnel", "upgrade"])
        .assert()
        .failure()
        .stderr(contains("dpid auth login"));
}

#[test]
fn tunnel_create_requires_listener_ports() {
    let home = TempDir::new().unwrap();

    dpid(&home)
        .args(["tunnel", "create", "--tunnel-ssh-listener", "2222"])
        .assert()
        .failure()
        .stderr(contains("--tunnel-http-listener"));
}

#[test]
fn login_against_an_unreachable_panel_fails() {
    let home = TempDir::new().unwrap();

    dpid(&home)
        .args(["auth", "login", "--email", "dev@devetek.com", "--password", "secret"])
        .assert()
        .failure()
        .stderr(contains("Login error"));

    assert!(!home.path().join(".devetek").join("session").exists());
}

#[test]
fn tunnel_status_reports_an_unreachable_release_server() {
    let home = TempDir::new().unwrap();

    dpid(&home)
        .args(["tunnel", "status"])
        .assert()
        .success()
        .stdout(contains("Latest"))
        .stdout(contains("unavailable"));
}

#[test]
fn tunnel_upgrade_without_release_metadata_installs_nothing() {
    let home = TempDir::new().unwrap();
    let workdir = home.path().join(".devetek");
    std::fs::create_dir_all(&workdir).unwrap();
    std::fs::write(workdir.join("session"), "abc123").unwrap();

    dpid(&home)
        .args(["tunnel", "upgrade"])
        .assert()
        .success()
        .stdout(contains("Failed to fetch the new marijan version"))
        .stdout(contains("Installing new version").not())
        .stderr(contains("[ERROR]").not());
}
