//! Logging System
//!
//! Structured logging through `tracing`. Level, format and destinations come from
//! [`LoggingConfig`] and can be overridden from the environment. Mutation events reach
//! the log through [`crate::sync::TracingSink`].

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// File name used when the configured log path is a directory
pub const DEFAULT_LOG_FILE_NAME: &str = "treemirror.log";

/// Resolve the log file path with precedence: CLI, TREEMIRROR_LOG_FILE env, config file.
///
/// An existing directory, or a path written with a trailing separator, gets
/// [`DEFAULT_LOG_FILE_NAME`] appended. `None` means log to the console only.
pub fn resolve_log_file_path(
    cli_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
) -> Option<PathBuf> {
    let env_file = std::env::var_os("TREEMIRROR_LOG_FILE").map(PathBuf::from);
    [cli_file, env_file, config_file]
        .into_iter()
        .flatten()
        .find(|p| !p.as_os_str().is_empty())
        .map(|p| expand_directory(&p))
}

fn expand_directory(path: &Path) -> PathBuf {
    let trailing_separator = path
        .as_os_str()
        .to_string_lossy()
        .ends_with(std::path::is_separator);
    if trailing_separator || path.is_dir() {
        path.join(DEFAULT_LOG_FILE_NAME)
    } else {
        path.to_path_buf()
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether logging is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, file, file+stdout, file+stderr
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output includes file
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Enable colored output (text format, console only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "file+stdout".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

/// Initialize the process-wide subscriber
///
/// Priority order (highest to lowest):
/// 1. CLI arguments (`cli_file`; other flags are folded into `config` by the caller)
/// 2. Environment variables (TREEMIRROR_LOG, TREEMIRROR_LOG_FORMAT, ...)
/// 3. Configuration file
/// 4. Defaults
pub fn init_logging(config: &LoggingConfig, cli_file: Option<PathBuf>) -> Result<(), SyncError> {
    if !config.enabled {
        return Registry::default()
            .with(EnvFilter::new("off"))
            .try_init()
            .map_err(|e| SyncError::ConfigError(format!("Failed to install logger: {}", e)));
    }

    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let mut output = determine_output(config)?;

    let file_writer = if output.file {
        match resolve_log_file_path(cli_file, config.file.clone()) {
            Some(path) => match open_log_file(&path) {
                Ok(file) => Some(Mutex::new(file)),
                Err(e) => {
                    eprintln!("Warning: {}; logging to console only", e);
                    None
                }
            },
            None => None,
        }
    } else {
        None
    };
    if output.file && file_writer.is_none() {
        output.file = false;
        if !output.stdout && !output.stderr {
            output.stdout = true;
        }
    }

    let console: Option<BoxMakeWriter> = match (output.stdout, output.stderr) {
        (true, true) => Some(BoxMakeWriter::new(std::io::stdout.and(std::io::stderr))),
        (true, false) => Some(BoxMakeWriter::new(std::io::stdout)),
        (false, true) => Some(BoxMakeWriter::new(std::io::stderr)),
        (false, false) => None,
    };
    // Colors only when nothing goes to a file.
    let ansi = config.color && file_writer.is_none();
    let writer = match (file_writer, console) {
        (Some(file), Some(console)) => BoxMakeWriter::new(file.and(console)),
        (Some(file), None) => BoxMakeWriter::new(file),
        (None, Some(console)) => console,
        (None, None) => BoxMakeWriter::new(std::io::stdout),
    };

    let base_subscriber = Registry::default().with(filter);
    let result = if format == "json" {
        base_subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init()
    } else {
        base_subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init()
    };

    result.map_err(|e| SyncError::ConfigError(format!("Failed to install logger: {}", e)))
}

fn open_log_file(path: &Path) -> Result<File, String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create log directory {:?}: {}", parent, e))?;
        }
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Failed to open log file {:?}: {}", path, e))
}

/// Build environment filter from config or environment variables
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, SyncError> {
    if let Ok(filter) = EnvFilter::try_from_env("TREEMIRROR_LOG") {
        return Ok(filter);
    }

    if config.level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| SyncError::ConfigError(format!("Invalid log level '{}': {}", config.level, e)))?;

    for (module, module_level) in &config.modules {
        let directive = format!("{}={}", module, module_level);
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| SyncError::ConfigError(format!("Invalid log directive: {}", e)))?,
        );
    }

    Ok(filter)
}

/// Determine output format from config or environment
fn determine_format(config: &LoggingConfig) -> Result<String, SyncError> {
    if let Ok(format) = std::env::var("TREEMIRROR_LOG_FORMAT") {
        if format == "json" || format == "text" {
            return Ok(format);
        }
    }

    let format = config.format.as_str();
    if format != "json" && format != "text" {
        return Err(SyncError::ConfigError(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            format
        )));
    }

    Ok(format.to_string())
}

/// Output destinations
#[derive(Debug, PartialEq, Eq)]
struct OutputDestinations {
    stdout: bool,
    stderr: bool,
    file: bool,
}

/// Determine output destinations from config or environment
fn determine_output(config: &LoggingConfig) -> Result<OutputDestinations, SyncError> {
    if let Ok(output) = std::env::var("TREEMIRROR_LOG_OUTPUT") {
        return parse_output_destinations(&output);
    }
    parse_output_destinations(&config.output)
}

fn parse_output_destinations(output: &str) -> Result<OutputDestinations, SyncError> {
    let (stdout, stderr, file) = match output {
        "stdout" => (true, false, false),
        "stderr" => (false, true, false),
        "file" => (false, false, true),
        "file+stdout" => (true, false, true),
        "file+stderr" => (false, true, true),
        _ => {
            return Err(SyncError::ConfigError(format!(
                "Invalid log output: {} (must be 'stdout', 'stderr', 'file', 'file+stdout', or 'file+stderr')",
                output
            )))
        }
    };
    Ok(OutputDestinations {
        stdout,
        stderr,
        file,
    })
}
