//! CGI entry point for the delete endpoint.

use cgi_upload::cli::{run_cgi, Endpoint};
use std::process::ExitCode;

fn main() -> ExitCode {
    run_cgi(Endpoint::Delete)
}
