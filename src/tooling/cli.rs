//! CLI Tooling
//!
//! Command-line interface for mirroring a source directory into a replica, either
//! continuously (`run`) or as a single pass (`once`).

use crate::concurrency::OverlapPolicy;
use crate::config::{ConfigLoader, MirrorConfig};
use crate::error::SyncError;
use crate::scheduler::Scheduler;
use crate::strategy::{ChangeKind, IdentityKind};
use crate::sync::{PassReport, SyncEngine};
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Treemirror CLI - one-way directory mirroring
#[derive(Parser, Debug)]
#[command(name = "treemirror")]
#[command(about = "Keep a replica directory an exact one-way mirror of a source directory")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stdout, file+stderr)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path, or a directory to put treemirror.log in
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mirror periodically until Enter or Ctrl-C
    Run {
        #[command(flatten)]
        mirror: MirrorArgs,
    },
    /// Run a single reconciliation pass and print what it did
    Once {
        #[command(flatten)]
        mirror: MirrorArgs,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

impl Commands {
    pub fn mirror_args(&self) -> &MirrorArgs {
        match self {
            Commands::Run { mirror } | Commands::Once { mirror, .. } => mirror,
        }
    }
}

/// Settings shared by every command; each one overrides the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct MirrorArgs {
    /// Source directory (only ever read)
    pub source: Option<PathBuf>,

    /// Replica directory (made identical to the source)
    pub replica: Option<PathBuf>,

    /// Seconds between passes
    #[arg(long)]
    pub period: Option<u64>,

    /// How entries are matched between source and replica
    #[arg(long, value_enum)]
    pub identity: Option<IdentityKind>,

    /// How a matched file is judged stale
    #[arg(long, value_enum)]
    pub change_detection: Option<ChangeKind>,

    /// What to do with a trigger while a pass is still running
    #[arg(long, value_enum)]
    pub overlap: Option<OverlapPolicy>,

    /// Do not descend into directories whose contents already match
    #[arg(long)]
    pub prune_unchanged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Printable result of a command
#[derive(Debug)]
pub struct CommandOutcome {
    pub output: String,
    /// False when the command finished but something along the way failed
    pub success: bool,
}

/// Resolved configuration for one CLI invocation
pub struct CliContext {
    config: MirrorConfig,
    log_file: Option<PathBuf>,
}

impl CliContext {
    /// Load configuration and fold the command line on top of it
    pub fn new(cli: &Cli) -> Result<Self, SyncError> {
        let mut config = match &cli.config {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };
        apply_overrides(&mut config, cli, cli.command.mirror_args());
        config.validate()?;

        Ok(Self {
            config,
            log_file: cli.log_file.clone(),
        })
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Log file given on the command line, which outranks env and config
    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_file.clone()
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<CommandOutcome, SyncError> {
        match command {
            Commands::Run { .. } => self.run(),
            Commands::Once { format, .. } => self.once(*format),
        }
    }

    fn once(&self, format: OutputFormat) -> Result<CommandOutcome, SyncError> {
        let engine = SyncEngine::new(&self.config)?;
        let report = engine.run_once()?;
        let output = match format {
            OutputFormat::Text => format_report_text(&report),
            OutputFormat::Json => serde_json::to_string_pretty(&report)
                .map_err(|e| SyncError::ConfigError(format!("Failed to render report: {}", e)))?,
        };
        Ok(CommandOutcome {
            output,
            success: report.is_clean(),
        })
    }

    fn run(&self) -> Result<CommandOutcome, SyncError> {
        let engine = Arc::new(SyncEngine::new(&self.config)?);
        let scheduler = Scheduler::new(engine, self.config.period());

        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| SyncError::Runtime(format!("Failed to start async runtime: {}", e)))?;
        let result = runtime.block_on(async {
            scheduler.start()?;
            println!("Mirroring started. Press Enter or Ctrl-C to stop.");
            wait_for_stop().await;
            scheduler.stop().await;
            Ok::<(), SyncError>(())
        });
        // A pending stdin read cannot be cancelled, so do not wait on it forever.
        runtime.shutdown_timeout(Duration::from_secs(1));
        result?;

        Ok(CommandOutcome {
            output: "Mirroring stopped.".to_string(),
            success: true,
        })
    }
}

fn apply_overrides(config: &mut MirrorConfig, cli: &Cli, args: &MirrorArgs) {
    if let Some(source) = &args.source {
        config.source = source.clone();
    }
    if let Some(replica) = &args.replica {
        config.replica = replica.clone();
    }
    if let Some(period) = args.period {
        config.period_secs = period;
    }
    if let Some(identity) = args.identity {
        config.identity = identity;
    }
    if let Some(change) = args.change_detection {
        config.change_detection = change;
    }
    if let Some(overlap) = args.overlap {
        config.overlap = overlap;
    }
    if args.prune_unchanged {
        config.prune_unchanged = true;
    }

    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }
    if let Some(output) = &cli.log_output {
        config.logging.output = output.clone();
    }
}

/// Resolves on Enter or Ctrl-C; without an interactive stdin only Ctrl-C counts
async fn wait_for_stop() {
    let enter = async {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        match lines.next_line().await {
            Ok(Some(_)) => {}
            _ => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = enter => info!("Stop requested from console"),
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => info!("Interrupt received"),
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        },
    }
}

fn format_report_text(report: &PassReport) -> String {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Mutation", "Count"]);
    let rows = [
        ("Directories created", report.directories_created),
        ("Files created", report.files_created),
        ("Files updated", report.files_updated),
        ("Files renamed", report.files_renamed),
        ("Directories renamed", report.directories_renamed),
        ("Files deleted", report.files_deleted),
        ("Directories deleted", report.directories_deleted),
        ("Failures", report.failures),
    ];
    for (label, count) in rows {
        table.add_row(vec![label.to_string(), count.to_string()]);
    }
    format!("{}\nPass took {} ms", table, report.duration_ms)
}
