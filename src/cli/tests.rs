//! Unit tests for CLI parsing and the request driver

use crate::cli::{respond, CgiArgs, Cli, Commands, Endpoint, RequestArgs};
use crate::response::{Status, StatusLineStyle};
use clap::Parser;
use std::io::{self, Cursor, Read};

#[test]
fn test_upload_command_with_flags() {
    let cli = Cli::try_parse_from([
        "cgi-upload",
        "upload",
        "--method",
        "POST",
        "--content-length",
        "37",
        "--upload-dir",
        "/srv/uploads",
    ])
    .unwrap();

    match cli.command {
        Commands::Upload(args) => {
            assert_eq!(args.method, "POST");
            assert_eq!(args.content_length.as_deref(), Some("37"));
            assert_eq!(args.upload_dir.unwrap().to_string_lossy(), "/srv/uploads");
        }
        _ => panic!("Expected Upload command"),
    }
}

#[test]
fn test_delete_command_with_query_string() {
    let cli = Cli::try_parse_from([
        "cgi-upload",
        "--config",
        "handler.toml",
        "delete",
        "--method",
        "DELETE",
        "--query-string",
        "filename=a.txt",
    ])
    .unwrap();

    assert_eq!(cli.config.unwrap().to_string_lossy(), "handler.toml");
    match cli.command {
        Commands::Delete(args) => {
            assert_eq!(args.method, "DELETE");
            assert_eq!(args.query_string, "filename=a.txt");
        }
        _ => panic!("Expected Delete command"),
    }
}

#[test]
fn test_negative_content_length_is_accepted_as_text() {
    let cli = Cli::try_parse_from(["cgi-upload", "upload", "--content-length", "-5"]).unwrap();
    match cli.command {
        Commands::Upload(args) => assert_eq!(args.content_length.as_deref(), Some("-5")),
        _ => panic!("Expected Upload command"),
    }
}

#[test]
fn test_cgi_args_parse_without_arguments() {
    assert!(CgiArgs::try_parse_from([Endpoint::Upload.binary_name()]).is_ok());
}

#[test]
fn test_missing_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["cgi-upload"]).is_err());
}

fn post_args(dir: &std::path::Path, body_len: usize) -> RequestArgs {
    RequestArgs {
        method: "POST".to_string(),
        content_length: Some(body_len.to_string()),
        upload_dir: Some(dir.to_path_buf()),
        ..RequestArgs::default()
    }
}

#[test]
fn test_respond_upload() {
    let dir = tempfile::tempdir().unwrap();
    let body = b"Content-Disposition: form-data; filename=\"note.txt\"\r\n\r\nhi there";
    let (res, style) = respond(
        Endpoint::Upload,
        &post_args(dir.path(), body.len()),
        None,
        &mut Cursor::new(body.to_vec()),
    );
    assert_eq!(res.status(), Status::Ok);
    assert_eq!(style, StatusLineStyle::Http);
    assert_eq!(
        std::fs::read(dir.path().join("note.txt")).unwrap(),
        b"hi there"
    );
}

#[test]
fn test_respond_reports_bad_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let (res, _) = respond(
        Endpoint::Delete,
        &RequestArgs::default(),
        Some(&missing),
        &mut io::empty(),
    );
    assert_eq!(res.status(), Status::InternalError);
    assert!(res.body().contains("failed to read config file"));
    assert_eq!(res.content_type(), "text/plain");
}

#[test]
fn test_respond_turns_panic_into_500() {
    struct Exploding;
    impl Read for Exploding {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            panic!("input exploded");
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let (res, _) = respond(
        Endpoint::Upload,
        &post_args(dir.path(), 100),
        None,
        &mut Exploding,
    );
    assert_eq!(res.status(), Status::InternalError);
    assert_eq!(res.content_type(), "text/html");
    assert!(res.body().contains("input exploded"));
    assert_eq!(res.exit_code(), 1);
}
