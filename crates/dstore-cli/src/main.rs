//! `dstore` command line tool.

use clap::{ColorChoice, Parser};
use dstore_cli::logging::{LogConfig, LogFormat, init_logging};
use dstore_model::ImportStatus;
use std::io::{self, IsTerminal};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{run_drop, run_import, run_schema, run_status};
use crate::summary::{print_import, print_schema, print_status};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match &cli.command {
        Command::Import(args) => match run_import(args) {
            Ok(outcome) => {
                print_import(&outcome);
                if outcome.summary.result.status() == ImportStatus::Error {
                    1
                } else {
                    0
                }
            }
            Err(error) => report(&error),
        },
        Command::Status(args) => match run_status(args) {
            Ok(Some(state)) => {
                print_status(&state);
                0
            }
            Ok(None) => {
                println!("No import state at {}", args.state.display());
                0
            }
            Err(error) => report(&error),
        },
        Command::Drop(args) => match run_drop(args) {
            Ok(Some(removed)) => {
                println!("Removed {removed} records and {}", args.state.display());
                0
            }
            Ok(None) => {
                println!("No import state at {}", args.state.display());
                0
            }
            Err(error) => report(&error),
        },
        Command::Schema(args) => match run_schema(args) {
            Ok(schema) => {
                print_schema(&schema);
                0
            }
            Err(error) => report(&error),
        },
    };
    std::process::exit(exit_code);
}

fn report(error: &anyhow::Error) -> i32 {
    eprintln!("error: {error:#}");
    1
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let level_filter = match cli.log_level {
        Some(LogLevelArg::Error) => LevelFilter::ERROR,
        Some(LogLevelArg::Warn) => LevelFilter::WARN,
        Some(LogLevelArg::Info) => LevelFilter::INFO,
        Some(LogLevelArg::Debug) => LevelFilter::DEBUG,
        Some(LogLevelArg::Trace) => LevelFilter::TRACE,
        None => cli.verbosity.tracing_level_filter(),
    };
    let format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    let mut config = LogConfig::default()
        .with_level(level_filter)
        .with_format(format)
        .with_timestamps(cli.log_timestamps)
        .with_log_file(cli.log_file.clone());
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
