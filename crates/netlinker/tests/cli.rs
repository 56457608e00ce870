//! Tests for the netlinker binary

use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

const FIXTURES: &str = r#"
[[routes]]
dst = "10.10.10.0/24"
link_index = 5

[[routes]]
dst = "10.10.20.0/24"
gw = "10.10.10.254"
link_index = 5

[[routes]]
dst = "2001:db8::/64"
link_index = 2
"#;

fn fixtures(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn netlinker(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_netlinker"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run netlinker")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_check_accepts_valid_fixtures() {
    let file = fixtures(FIXTURES);
    let output = netlinker(&["check", file.path().to_str().unwrap()]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("3 routes accepted"));
}

#[test]
fn test_check_reports_first_rejection() {
    let file = fixtures(
        r#"
        [[routes]]
        dst = "10.10.10.0/24"

        [[routes]]
        link_index = 4

        [[routes]]
        dst = "10.10.10.0/24"
        "#,
    );
    let output = netlinker(&["check", file.path().to_str().unwrap()]);

    assert!(!output.status.success());
    let out = stdout(&output);
    assert!(out.contains("route 1"), "unexpected output: {}", out);
    assert!(!out.contains("route 2"));
}

#[test]
fn test_list_by_family_and_link() {
    let file = fixtures(FIXTURES);
    let path = file.path().to_str().unwrap();

    let output = netlinker(&["list", path, "--family", "v4", "--oif", "5"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).lines().count(), 2);

    let output = netlinker(&["list", path, "--family", "v6"]);
    assert_eq!(stdout(&output).lines().count(), 1);
    assert!(stdout(&output).contains("2001:db8::/64"));
}

#[test]
fn test_list_json() {
    let file = fixtures(FIXTURES);
    let output = netlinker(&[
        "list",
        file.path().to_str().unwrap(),
        "--gw",
        "10.10.10.254",
        "--json",
    ]);
    assert!(output.status.success());

    let routes: Vec<netlinker::Route> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].dst, Some("10.10.20.0/24".parse().unwrap()));
}

#[test]
fn test_missing_fixtures_file() {
    let output = netlinker(&["list", "/nonexistent/routes.toml"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("/nonexistent/routes.toml"));
}

#[test]
fn test_demo_fixtures_are_valid() {
    let demo = concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/routes.toml");
    let output = netlinker(&["check", demo]);
    assert!(output.status.success(), "{}", stdout(&output));
    assert!(stdout(&output).contains("5 routes accepted"));
}
