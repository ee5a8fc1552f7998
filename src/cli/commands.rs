use crate::{
    config::HandlerConfig,
    context::{parse_content_length, RequestContext},
    delete::handle_delete,
    ids::InvocationId,
    logging::{init_logging, LogConfig},
    response::{escape_html, Response, Status, StatusLineStyle},
    upload::UploadHandler,
};
use clap::{Args, Parser, Subcommand};
use std::backtrace::Backtrace;
use std::io::{self, Read};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Mutex, Once};
use tracing::{error, info, info_span};

/// Command-line interface for the upload and delete handlers
#[derive(Parser, Debug)]
#[command(name = "cgi-upload")]
#[command(version, about = "Streaming multipart upload and delete handlers for CGI hosts", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "CGI_UPLOAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// The endpoint to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Endpoints, each handling exactly one request
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store the file part of a multipart body read from stdin
    Upload(RequestArgs),
    /// Delete the file named by the `filename` query parameter
    Delete(RequestArgs),
}

/// Request metadata, taken from the CGI environment unless given as flags
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestArgs {
    /// Request method
    #[arg(long, env = "REQUEST_METHOD", default_value = "")]
    pub method: String,

    /// Declared body length; empty, negative or non-numeric counts as 0
    #[arg(long, env = "CONTENT_LENGTH", allow_hyphen_values = true)]
    pub content_length: Option<String>,

    /// Raw query string (delete only)
    #[arg(long, env = "QUERY_STRING", default_value = "")]
    pub query_string: String,

    /// Upload directory; overrides UPLOAD_FOLDER and the config file
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    /// Upstream request id to tag log lines with
    #[arg(long, env = "HTTP_X_REQUEST_ID")]
    pub request_id: Option<String>,
}

/// Argument set for the argument-less CGI entry points
#[derive(Parser, Debug)]
pub struct CgiArgs {
    /// TOML configuration file
    #[arg(long, env = "CGI_UPLOAD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Upload,
    Delete,
}

impl Endpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::Upload => "upload",
            Endpoint::Delete => "delete",
        }
    }

    /// Name of the dedicated CGI binary for this endpoint.
    pub fn binary_name(self) -> &'static str {
        match self {
            Endpoint::Upload => "upload-handler",
            Endpoint::Delete => "delete-handler",
        }
    }
}

/// Run the subcommand selected on the command line.
pub fn run_cli(cli: Cli) -> ExitCode {
    let (endpoint, args) = match cli.command {
        Commands::Upload(args) => (Endpoint::Upload, args),
        Commands::Delete(args) => (Endpoint::Delete, args),
    };
    run_endpoint(endpoint, &args, cli.config.as_deref())
}

/// Entry point for the dedicated CGI binaries.
///
/// CGI hosts may pass search words as arguments; only the environment is
/// consulted.
pub fn run_cgi(endpoint: Endpoint) -> ExitCode {
    match CgiArgs::try_parse_from([endpoint.binary_name()]) {
        Ok(args) => run_endpoint(endpoint, &args.request, args.config.as_deref()),
        Err(err) => emit(
            &internal_error_response(endpoint, &err.to_string()),
            HandlerConfig::from_env().status_line,
        ),
    }
}

/// Handle one request end to end: log setup, processing, output, exit status.
///
/// This is the only place the process outcome is decided.
pub fn run_endpoint(endpoint: Endpoint, args: &RequestArgs, config_file: Option<&Path>) -> ExitCode {
    let guard = match init_logging(&LogConfig::from_env()) {
        Ok(guard) => Some(guard),
        Err(err) => {
            // Logging is best effort; the response still has to go out.
            eprintln!("cgi-upload: {err:#}");
            None
        }
    };

    let (response, style) = respond(endpoint, args, config_file, &mut io::stdin().lock());
    let code = emit(&response, style);

    drop(guard);
    code
}

/// Produce the response for one request. Never fails and never panics
/// outward: configuration errors and handler panics become 500 responses.
pub fn respond<R: Read + ?Sized>(
    endpoint: Endpoint,
    args: &RequestArgs,
    config_file: Option<&Path>,
    input: &mut R,
) -> (Response, StatusLineStyle) {
    install_panic_hook();

    let id = InvocationId::from_header_or_new(args.request_id.as_deref());
    let span = info_span!(
        "invocation",
        id = %id,
        endpoint = endpoint.as_str(),
        method = %args.method
    );
    let _entered = span.enter();

    let mut config = match HandlerConfig::load(config_file) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %format!("{err:#}"), "configuration failed");
            return (
                internal_error_response(endpoint, &format!("{err:?}")),
                HandlerConfig::from_env().status_line,
            );
        }
    };
    if let Some(dir) = &args.upload_dir {
        config.upload_dir = dir.clone();
    }
    let style = config.status_line;

    let ctx = RequestContext::new(
        args.method.as_str(),
        parse_content_length(args.content_length.as_deref()),
        &config.upload_dir,
    )
    .with_query_string(args.query_string.as_str());

    take_panic_report();
    let result = panic::catch_unwind(AssertUnwindSafe(|| match endpoint {
        Endpoint::Upload => UploadHandler::new(config).handle(&ctx, input),
        Endpoint::Delete => handle_delete(&ctx),
    }));

    // PANIC RECOVERY: the host has no other signal channel, so a panic still
    // produces a response.
    let response = match result {
        Ok(response) => response,
        Err(payload) => {
            let detail = take_panic_report().unwrap_or_else(|| panic_message(payload.as_ref()));
            error!(detail = %detail, "handler panicked");
            internal_error_response(endpoint, &detail)
        }
    };

    info!(status = response.status().code().as_u16(), "response ready");
    (response, style)
}

/// Write `response` to stdout and map it to the process exit status.
fn emit(response: &Response, style: StatusLineStyle) -> ExitCode {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match response.write_to(&mut out, style) {
        Ok(()) => ExitCode::from(response.exit_code()),
        Err(err) => {
            error!(error = %err, "failed to write response");
            ExitCode::FAILURE
        }
    }
}

/// 500 response carrying a diagnostic trace, shaped per endpoint.
pub fn internal_error_response(endpoint: Endpoint, detail: &str) -> Response {
    match endpoint {
        Endpoint::Upload => Response::html(
            Status::InternalError,
            &format!("Error occurred:<pre>{}</pre>", escape_html(detail)),
        ),
        Endpoint::Delete => {
            Response::text(Status::InternalError, format!("Error occurred:\n{detail}"))
        }
    }
}

static PANIC_REPORT: Mutex<Option<String>> = Mutex::new(None);
static PANIC_HOOK: Once = Once::new();

/// Record panic message, location and backtrace for the 500 body.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let report = format!("{info}\n\nstack backtrace:\n{}", Backtrace::force_capture());
            if let Ok(mut slot) = PANIC_REPORT.lock() {
                *slot = Some(report);
            }
            previous(info);
        }));
    });
}

fn take_panic_report() -> Option<String> {
    PANIC_REPORT.lock().ok().and_then(|mut slot| slot.take())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
