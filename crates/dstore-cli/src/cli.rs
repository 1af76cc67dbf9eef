//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use dstore_storage::StorageKind;

#[derive(Parser)]
#[command(
    name = "dstore",
    version,
    about = "Resumable import of CSV/TSV files into a record store",
    long_about = "Import delimited text files into a record store in time-bounded passes.\n\n\
                  Progress is saved after every pass, so an interrupted or budgeted\n\
                  import continues where it stopped on the next invocation."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Prefix log lines with a timestamp.
    #[arg(long = "log-timestamps", global = true)]
    pub log_timestamps: bool,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start or continue importing a file.
    Import(ImportArgs),

    /// Show the saved progress of an import.
    Status(JobArgs),

    /// Remove all imported records and the saved progress.
    Drop(JobArgs),

    /// Print the schema that would be derived from a file's header row.
    Schema(SchemaArgs),
}

/// Where the job state and on-disk records live.
#[derive(Args, Clone)]
pub struct JobArgs {
    /// Job state file.
    #[arg(long = "state", value_name = "PATH", default_value = "dstore-job.json")]
    pub state: PathBuf,

    /// Directory for on-disk storage backends.
    #[arg(long = "storage-dir", value_name = "DIR", default_value = "dstore-data")]
    pub storage_dir: PathBuf,
}

#[derive(Parser)]
pub struct ImportArgs {
    /// File to import.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Resource identifier (default: the file name).
    #[arg(long = "id")]
    pub id: Option<String>,

    /// Declared MIME type (default: detected from the extension).
    #[arg(long = "mime-type", value_name = "TYPE")]
    pub mime_type: Option<String>,

    /// Storage backend for a new import.
    #[arg(long = "storage", value_enum, default_value = "log")]
    pub storage: StorageArg,

    #[command(flatten)]
    pub job: JobArgs,

    #[command(flatten)]
    pub options: OptionArgs,

    /// Retry an import whose last pass failed.
    #[arg(long = "retry")]
    pub retry: bool,
}

/// Import options. Flags override values from `--config`.
#[derive(Args, Clone, Default)]
pub struct OptionArgs {
    /// TOML file with `chunk_size`, `time_budget_ms` and `max_passes`.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Bytes read per chunk.
    #[arg(long = "chunk-size", value_name = "BYTES")]
    pub chunk_size: Option<usize>,

    /// Wall-clock budget per pass, in milliseconds.
    #[arg(long = "time-budget-ms", value_name = "MS")]
    pub time_budget_ms: Option<u64>,

    /// Stop after this many passes (progress is saved).
    #[arg(long = "max-passes", value_name = "N")]
    pub max_passes: Option<u32>,
}

#[derive(Parser)]
pub struct SchemaArgs {
    /// File whose header row is sanitized.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Declared MIME type (default: detected from the extension).
    #[arg(long = "mime-type", value_name = "TYPE")]
    pub mime_type: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StorageArg {
    Memory,
    Log,
}

impl From<StorageArg> for StorageKind {
    fn from(arg: StorageArg) -> Self {
        match arg {
            StorageArg::Memory => StorageKind::Memory,
            StorageArg::Log => StorageKind::Log,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
