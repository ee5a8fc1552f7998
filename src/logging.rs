//! Structured logging for CGI invocations.
//!
//! stdout belongs to the HTTP response, so log output goes to stderr (which
//! most CGI hosts append to their error log) or to a file in
//! `CGI_UPLOAD_LOG_DIR`.
//!
//! | Variable | Values | Default |
//! |---|---|---|
//! | `CGI_UPLOAD_LOG_LEVEL` | trace/debug/info/warn/error | `info` |
//! | `CGI_UPLOAD_LOG_FORMAT` | json/pretty/compact | `compact` |
//! | `CGI_UPLOAD_LOG_DIR` | directory for `cgi-upload.log` | unset (stderr) |
//!
//! `RUST_LOG`, when set, takes precedence over the level.

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub const ENV_LOG_LEVEL: &str = "CGI_UPLOAD_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "CGI_UPLOAD_LOG_FORMAT";
pub const ENV_LOG_DIR: &str = "CGI_UPLOAD_LOG_DIR";

/// Name of the log file inside the log directory.
pub const LOG_FILE_NAME: &str = "cgi-upload.log";

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Write to `<dir>/cgi-upload.log` instead of stderr
    pub log_dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Compact,
            log_dir: None,
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            log_level: lookup(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            format: lookup(ENV_LOG_FORMAT)
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(defaults.format),
            log_dir: lookup(ENV_LOG_DIR)
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Keeps the file writer alive; drop it after the response is flushed.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
}

/// Install the global subscriber described by `config`.
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level().as_str()));
    let registry = tracing_subscriber::registry().with(env_filter);

    match &config.log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(LOG_FILE_NAME)
                .build(dir)
                .with_context(|| format!("Failed to open log file in {}", dir.display()))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt_layer(config.format, non_blocking, false))
                .try_init()
                .context("Failed to initialize file logging")?;
            Ok(LoggingGuard {
                _worker: Some(guard),
            })
        }
        None => {
            registry
                .with(fmt_layer(
                    config.format,
                    std::io::stderr,
                    std::io::stderr().is_terminal(),
                ))
                .try_init()
                .context("Failed to initialize stderr logging")?;
            Ok(LoggingGuard { _worker: None })
        }
    }
}

fn fmt_layer<S, W>(format: LogFormat, writer: W, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("invalid"), LogFormat::Compact); // Default
    }

    #[test]
    fn test_log_config_from_lookup() {
        let config = LogConfig::from_lookup(|key| match key {
            ENV_LOG_LEVEL => Some("debug".to_string()),
            ENV_LOG_FORMAT => Some("json".to_string()),
            ENV_LOG_DIR => Some("/var/log/cgi".to_string()),
            _ => None,
        });
        assert_eq!(config.level(), Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/cgi")));
    }

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::from_lookup(|key| match key {
            ENV_LOG_DIR => Some(String::new()),
            _ => None,
        });
        assert_eq!(config, LogConfig::default());
        assert_eq!(config.level(), Level::INFO);
    }
}
