use cgi_upload::cli::{run_cli, Cli};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    run_cli(Cli::parse())
}
