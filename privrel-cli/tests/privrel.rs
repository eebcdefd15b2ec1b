use anyhow::Result;
use mockito::{Mock, Server, ServerGuard};
use std::{
    fs,
    path::Path,
    process::{Command, Output},
};
use tempfile::TempDir;

const URL: &str = "https://github.com/acme/tool/releases/download/v1.2.0/tool_darwin_arm64.tar.gz";
const RELEASE_PATH: &str = "/repos/acme/tool/releases/tags/v1.2.0";
const ASSET_PATH: &str = "/repos/acme/tool/releases/assets/555";

fn privrel(server: &ServerGuard, token: Option<&str>, args: &[&str]) -> Result<Output> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_privrel"));
    cmd.env_remove("HOMEBREW_GITHUB_API_TOKEN")
        .env_remove("GITHUB_TOKEN")
        .args(["--no-credential-helper", "--api-base-url", server.url().as_str()])
        .args(args);
    if let Some(token) = token {
        cmd.env("HOMEBREW_GITHUB_API_TOKEN", token);
    }
    Ok(cmd.output()?)
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn release_mock(server: &mut ServerGuard, body: &str) -> Mock {
    server
        .mock("GET", RELEASE_PATH)
        .match_header("Authorization", "Bearer abc123")
        .with_status(200)
        .with_body(body)
        .create()
}

fn assert_empty_dir(dir: &Path) -> Result<()> {
    assert_eq!(fs::read_dir(dir)?.count(), 0, "{} is empty", dir.display());
    Ok(())
}

#[test]
fn downloads_asset() -> Result<()> {
    let mut server = Server::new();
    let release = release_mock(
        &mut server,
        r#"{"assets":[{"name":"tool_darwin_arm64.tar.gz","id":555}]}"#,
    );
    let asset = server
        .mock("GET", ASSET_PATH)
        .match_header("Accept", "application/octet-stream")
        // base64 of "abc123:"
        .match_header("Authorization", "Basic YWJjMTIzOg==")
        .with_status(200)
        .with_body(b"\x1f\x8b\x08\x00binary\x00bytes")
        .create();

    let td = TempDir::new()?;
    let output = privrel(
        &server,
        Some("abc123"),
        &[URL, "--out", &*td.path().to_string_lossy()],
    )?;

    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        fs::read(td.path().join("tool_darwin_arm64.tar.gz"))?,
        b"\x1f\x8b\x08\x00binary\x00bytes",
    );

    release.assert();
    asset.assert();
    Ok(())
}

#[test]
fn downloads_asset_by_project() -> Result<()> {
    let mut server = Server::new();
    let release = release_mock(
        &mut server,
        r#"{"assets":[{"name":"other.zip","id":1},{"name":"tool_darwin_arm64.tar.gz","id":555}]}"#,
    );
    let asset = server
        .mock("GET", ASSET_PATH)
        .with_status(200)
        .with_body("contents")
        .create();

    let td = TempDir::new()?;
    let out = td.path().join("tool.tgz");
    let output = privrel(
        &server,
        Some("abc123"),
        &[
            "--project",
            "acme/tool",
            "--tag",
            "v1.2.0",
            "--asset",
            "tool_darwin_arm64.tar.gz",
            "--out",
            &*out.to_string_lossy(),
        ],
    )?;

    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(fs::read_to_string(&out)?, "contents");

    release.assert();
    asset.assert();
    Ok(())
}

#[test]
fn asset_not_found() -> Result<()> {
    let mut server = Server::new();
    let release = release_mock(&mut server, r#"{"assets":[]}"#);
    let asset = server.mock("GET", ASSET_PATH).expect(0).create();

    let td = TempDir::new()?;
    let output = privrel(
        &server,
        Some("abc123"),
        &[URL, "--out", &*td.path().to_string_lossy()],
    )?;

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("resolve failed"), "{err}");
    assert!(
        err.contains("asset tool_darwin_arm64.tar.gz not found in release v1.2.0 (acme/tool)"),
        "{err}",
    );
    assert_empty_dir(td.path())?;

    release.assert();
    asset.assert();
    Ok(())
}

#[test]
fn release_not_found() -> Result<()> {
    let mut server = Server::new();
    let release = server
        .mock("GET", RELEASE_PATH)
        .with_status(404)
        .with_body(r#"{"message":"Not Found"}"#)
        .create();

    let td = TempDir::new()?;
    let output = privrel(
        &server,
        Some("abc123"),
        &[URL, "--out", &*td.path().to_string_lossy()],
    )?;

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(
        err.contains("release v1.2.0 not found (or token lacks access) for acme/tool"),
        "{err}",
    );
    assert_empty_dir(td.path())?;

    release.assert();
    Ok(())
}

#[test]
fn download_failure_leaves_no_file() -> Result<()> {
    let mut server = Server::new();
    let release = release_mock(
        &mut server,
        r#"{"assets":[{"name":"tool_darwin_arm64.tar.gz","id":555}]}"#,
    );
    let asset = server.mock("GET", ASSET_PATH).with_status(502).create();

    let td = TempDir::new()?;
    let output = privrel(
        &server,
        Some("abc123"),
        &[URL, "--out", &*td.path().to_string_lossy()],
    )?;

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("download failed"), "{err}");
    assert!(!err.contains("abc123"), "token is not printed: {err}");
    assert_empty_dir(td.path())?;

    release.assert();
    asset.assert();
    Ok(())
}

#[test]
fn malformed_url() -> Result<()> {
    let mut server = Server::new();
    let release = server.mock("GET", mockito::Matcher::Any).expect(0).create();

    let output = privrel(
        &server,
        Some("abc123"),
        &["https://github.com/acme/tool/releases/latest"],
    )?;

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("parse failed"), "{err}");

    release.assert();
    Ok(())
}

#[test]
fn missing_credential() -> Result<()> {
    let mut server = Server::new();
    let release = server.mock("GET", mockito::Matcher::Any).expect(0).create();

    let output = privrel(&server, None, &[URL])?;

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("credential failed"), "{err}");
    assert!(err.contains("HOMEBREW_GITHUB_API_TOKEN"), "{err}");

    release.assert();
    Ok(())
}

#[test]
fn invalid_args() -> Result<()> {
    let server = Server::new();
    let output = privrel(&server, Some("abc123"), &["--project", "acme/tool"])?;

    assert_eq!(output.status.code(), Some(127));
    assert!(
        stderr(&output).contains("You must pass --tag along with --project"),
        "{}",
        stderr(&output),
    );
    Ok(())
}

#[test]
fn invalid_api_base_url() -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_privrel"))
        .env("HOMEBREW_GITHUB_API_TOKEN", "abc123")
        .args(["--no-credential-helper", "--api-base-url", "not a url", URL])
        .output()?;

    assert_eq!(output.status.code(), Some(127));
    let err = stderr(&output);
    assert!(err.contains("invalid API base URL `not a url`"), "{err}");
    assert!(!err.contains("parse failed"), "{err}");
    Ok(())
}
