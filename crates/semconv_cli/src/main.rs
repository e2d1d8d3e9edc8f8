//! semconvgen CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 4: Compatibility failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const COMPATIBILITY_FAILURE: u8 = 4;
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "semconv=debug" } else { "semconv=info" };
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(
            EnvFilter::from_default_env()
                .add_directive(level.parse().unwrap())
                .add_directive("warn".parse().unwrap()),
        )
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match cli.command {
        Commands::Check(args) => commands::check::execute(args),
        Commands::Compatibility(args) => commands::compatibility::execute(args),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    // Model errors keep their type through anyhow contexts.
    if let Some(err) = e.downcast_ref::<semconv_model::Error>() {
        return match err {
            semconv_model::Error::Io(_) => ExitCodes::GENERAL_ERROR,
            _ => ExitCodes::VALIDATION_FAILURE,
        };
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("compatibility") {
        ExitCodes::COMPATIBILITY_FAILURE
    } else if msg.contains("validation") {
        ExitCodes::VALIDATION_FAILURE
    } else if msg.contains("argument") || msg.contains("not found") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}
