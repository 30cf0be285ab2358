//! pgforge CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments or configuration
//! - 3: Validation failure
//! - 4: Render error
//! - 5: I/O error or artifact collision

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod commands;
mod error;
mod handler;
mod store;

use commands::{Cli, Commands, LogFormat};
use error::HandlerError;
use pgforge_core::CoreError;
use pgforge_spec::SpecError;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const RENDER_ERROR: u8 = 4;
    pub const IO_ERROR: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, config).await,
        Commands::Validate(args) => commands::validate::execute(args, config).await,
        Commands::InstanceTypes(args) => commands::instance_types::execute(args).await,
        Commands::Serve(args) => commands::serve::execute(args, config).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            report(&e);
            ExitCode::from(categorize_error(&e))
        }
    }
}

/// `RUST_LOG` wins; otherwise pgforge crates log at info (debug with
/// `--verbose`) and everything else at warn. Logs go to stderr.
fn init_logging(verbose: bool, format: LogFormat) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pgforge={},warn", level)));

    let registry = tracing_subscriber::registry().with(filter);
    let log_result = match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

fn report(e: &anyhow::Error) {
    match validation_errors(e) {
        Some(errors) => {
            eprintln!("❌ Request rejected:");
            for field_error in errors {
                eprintln!("   - {}", field_error);
            }
        }
        None => eprintln!("❌ Error: {:#}", e),
    }
}

fn validation_errors(e: &anyhow::Error) -> Option<&pgforge_spec::ValidationErrors> {
    if let Some(SpecError::Validation(errors)) = e.downcast_ref::<SpecError>() {
        return Some(errors);
    }
    let core = match e.downcast_ref::<HandlerError>() {
        Some(HandlerError::Core(core)) => core,
        Some(_) => return None,
        None => e.downcast_ref::<CoreError>()?,
    };
    match core {
        CoreError::Validation(errors) => Some(errors),
        _ => None,
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(handler_error) = e.downcast_ref::<HandlerError>() {
        return match handler_error {
            HandlerError::Core(core) => categorize_core(core),
            HandlerError::Collision(_) | HandlerError::Io(_) => ExitCodes::IO_ERROR,
        };
    }
    if let Some(core) = e.downcast_ref::<CoreError>() {
        return categorize_core(core);
    }
    if let Some(spec) = e.downcast_ref::<SpecError>() {
        return match spec {
            SpecError::Validation(_) => ExitCodes::VALIDATION_FAILURE,
            SpecError::Io(_) => ExitCodes::IO_ERROR,
            _ => ExitCodes::INVALID_ARGS,
        };
    }
    ExitCodes::GENERAL_ERROR
}

fn categorize_core(e: &CoreError) -> u8 {
    if e.is_validation() {
        return ExitCodes::VALIDATION_FAILURE;
    }
    if e.is_render() {
        return ExitCodes::RENDER_ERROR;
    }
    match e {
        CoreError::Config(_) | CoreError::Toml(_) | CoreError::Spec(_) | CoreError::Iac(_) | CoreError::Playbook(_) => {
            ExitCodes::INVALID_ARGS
        }
        CoreError::Validation(_) => ExitCodes::VALIDATION_FAILURE,
    }
}
