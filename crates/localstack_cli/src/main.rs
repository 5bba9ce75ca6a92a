//! localstack CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Container engine unavailable
//! - 3: Container lifecycle failure

use std::process::ExitCode;

use clap::Parser;
use localstack_runner::{CancellationToken, RunnerError};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const ENGINE_UNAVAILABLE: u8 = 2;
    pub const LIFECYCLE_FAILURE: u8 = 3;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "localstack=debug,localstack_runner=debug,info"
    } else if cli.quiet {
        "error"
    } else {
        "localstack=info,localstack_runner=info,warn"
    };

    // Logs go to stderr so stdout carries only pull progress, container
    // output and command results.
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    let result = match cli.command {
        Commands::Start(args) => commands::start::execute(args, &cancel).await,
        Commands::Logs(args) => commands::logs::execute(args, &cancel).await,
        Commands::Stop(args) => commands::stop::execute(args).await,
        Commands::Endpoint(args) => commands::endpoint::execute(args),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(categorize_error(&e))
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<RunnerError>() {
        Some(RunnerError::Initialization(_)) => ExitCodes::ENGINE_UNAVAILABLE,
        Some(RunnerError::InvalidConfig(_)) | None => ExitCodes::GENERAL_ERROR,
        Some(_) => ExitCodes::LIFECYCLE_FAILURE,
    }
}
