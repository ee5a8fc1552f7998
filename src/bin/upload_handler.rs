//! CGI entry point for the upload endpoint. Reads the request from the
//! environment and stdin; takes no arguments.

use cgi_upload::cli::{run_cgi, Endpoint};
use std::process::ExitCode;

fn main() -> ExitCode {
    run_cgi(Endpoint::Upload)
}
