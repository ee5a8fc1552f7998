use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

fn run(exe: &str, args: &[&str], env: &[(&str, &str)], stdin: &[u8]) -> Output {
    let mut child = Command::new(exe)
        .args(args)
        .env_clear()
        .envs(env.iter().copied())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn handler");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(stdin)
        .expect("write body");
    child.wait_with_output().expect("wait for handler")
}

fn status_line(out: &Output) -> String {
    let stdout = String::from_utf8_lossy(&out.stdout);
    stdout.lines().next().unwrap_or_default().to_string()
}

fn dir_str(p: &Path) -> &str {
    p.to_str().expect("utf-8 temp path")
}

#[test]
fn test_upload_handler_stores_file() {
    let dir = tempfile::tempdir().unwrap();
    let body = b"filename=\"a.txt\"\r\n\r\nhello world------";
    let len = body.len().to_string();

    let out = run(
        env!("CARGO_BIN_EXE_upload-handler"),
        &[],
        &[
            ("REQUEST_METHOD", "POST"),
            ("CONTENT_LENGTH", len.as_str()),
            ("UPLOAD_FOLDER", dir_str(dir.path())),
        ],
        body,
    );

    assert_eq!(status_line(&out), "HTTP/1.1 200 OK");
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(
        std::fs::read(dir.path().join("a.txt")).unwrap(),
        b"hello world------"
    );
}

#[test]
fn test_upload_handler_rejects_get() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(
        env!("CARGO_BIN_EXE_upload-handler"),
        &[],
        &[
            ("REQUEST_METHOD", "GET"),
            ("UPLOAD_FOLDER", dir_str(dir.path())),
            ("CGI_UPLOAD_STATUS_LINE", "cgi"),
        ],
        b"",
    );
    assert_eq!(status_line(&out), "Status: 405 Method Not Allowed");
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_delete_handler_blocks_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(
        env!("CARGO_BIN_EXE_delete-handler"),
        &[],
        &[
            ("REQUEST_METHOD", "DELETE"),
            ("QUERY_STRING", "filename=../../etc/passwd"),
            ("UPLOAD_FOLDER", dir_str(dir.path())),
        ],
        b"",
    );
    assert_eq!(status_line(&out), "HTTP/1.1 403 Forbidden");
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_cli_delete_subcommand_with_flags() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("gone.txt"), b"x").unwrap();

    let out = run(
        env!("CARGO_BIN_EXE_cgi-upload"),
        &[
            "delete",
            "--method",
            "DELETE",
            "--query-string",
            "filename=gone.txt",
            "--upload-dir",
            dir_str(dir.path()),
        ],
        &[],
        b"",
    );
    assert_eq!(status_line(&out), "HTTP/1.1 200 OK");
    assert_eq!(out.status.code(), Some(0));
    assert!(!dir.path().join("gone.txt").exists());
}

#[test]
fn test_bad_config_file_yields_500() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("handler.toml");
    std::fs::write(&config, "no_such_key = 1\n").unwrap();

    let out = run(
        env!("CARGO_BIN_EXE_upload-handler"),
        &[],
        &[
            ("REQUEST_METHOD", "POST"),
            ("CGI_UPLOAD_CONFIG", dir_str(&config)),
        ],
        b"",
    );
    assert_eq!(status_line(&out), "HTTP/1.1 500 Internal Server Error");
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_logs_go_to_file_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("logs");
    let out = run(
        env!("CARGO_BIN_EXE_delete-handler"),
        &[],
        &[
            ("REQUEST_METHOD", "DELETE"),
            ("QUERY_STRING", "filename=nope.txt"),
            ("UPLOAD_FOLDER", dir_str(dir.path())),
            ("CGI_UPLOAD_LOG_DIR", dir_str(&logs)),
            ("CGI_UPLOAD_LOG_FORMAT", "json"),
        ],
        b"",
    );
    assert_eq!(status_line(&out), "HTTP/1.1 404 Not Found");
    let log = std::fs::read_to_string(logs.join("cgi-upload.log")).unwrap();
    assert!(log.contains("delete rejected"));
}

#[test]
fn test_config_failure_keeps_cgi_status_line() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("handler.toml");
    std::fs::write(&config, "no_such_key = 1\n").unwrap();

    let out = run(
        env!("CARGO_BIN_EXE_upload-handler"),
        &[],
        &[
            ("REQUEST_METHOD", "POST"),
            ("CGI_UPLOAD_CONFIG", dir_str(&config)),
            ("CGI_UPLOAD_STATUS_LINE", "cgi"),
        ],
        b"",
    );
    assert_eq!(status_line(&out), "Status: 500 Internal Server Error");
    assert_eq!(out.status.code(), Some(1));
}
