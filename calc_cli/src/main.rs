//! # calc_cli
//!
//! Command-line host for the calculation engine. Reads a JSON request,
//! runs it through the dispatcher and prints the JSON result on stdout.
//! Logs go to stderr so stdout stays machine-readable.
//!
//! ## Usage
//!
//! ```text
//! calc_cli calculate request.json
//! cat request.json | calc_cli calculate -
//! calc_cli validate request.json
//! calc_cli modules
//! calc_cli calculations hvac
//! calc_cli convert 25 C F temperature
//! calc_cli --config engine.toml calculate request.json
//! ```
//!
//! On an engine error the error is printed as JSON on stdout and the
//! process exits with 1 for caller mistakes, 2 for engine-side failures.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use calc_engine::{CalculationRequest, Dispatcher, EngineConfig, EngineError};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

/// Engineering calculation and compliance engine
#[derive(Parser, Debug)]
#[command(name = "calc_cli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine configuration file (TOML); CALC_ENGINE_* variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a calculation request
    Calculate {
        /// Request JSON file, or '-' for stdin
        request: String,
    },

    /// Check a request's inputs without calculating
    Validate {
        /// Request JSON file, or '-' for stdin
        request: String,
    },

    /// List disciplines
    Modules,

    /// List the calculations a discipline offers
    Calculations { discipline: String },

    /// Convert a value between units of one dimension
    Convert {
        #[arg(allow_hyphen_values = true)]
        value: f64,
        from: String,
        to: String,
        dimension: String,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = EngineConfig::load(cli.config.as_deref()).context("loading engine configuration")?;
    init_logging(&config.log_level);
    let dispatcher = Dispatcher::new(config).context("starting dispatcher")?;

    let outcome = match cli.command {
        Commands::Calculate { request } => {
            let request = read_request(&request)?;
            dispatcher.execute(&request).map(|r| print_json(&r))
        }
        Commands::Validate { request } => {
            let request = read_request(&request)?;
            dispatcher
                .validate_inputs(&request.discipline, &request.calculation_type, &request.inputs)
                .map(|r| print_json(&r))
        }
        Commands::Modules => Ok(print_json(&dispatcher.available_modules())),
        Commands::Calculations { discipline } => dispatcher
            .available_calculations(&discipline)
            .map(|c| print_json(&c)),
        Commands::Convert {
            value,
            from,
            to,
            dimension,
        } => dispatcher
            .convert_units(value, &from, &to, &dimension)
            .map(|c| print_json(&c)),
    };

    match outcome {
        Ok(printed) => {
            printed?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report(&err),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn read_request(source: &str) -> Result<CalculationRequest> {
    let text = if source == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("reading request from stdin")?;
        buf
    } else {
        fs::read_to_string(Path::new(source)).with_context(|| format!("reading request file {}", source))?
    };
    serde_json::from_str(&text).context("decoding request JSON")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(err: &EngineError) -> Result<ExitCode> {
    tracing::error!(code = err.error_code(), "{}", err);
    print_json(&json!({
        "error": err.error_code(),
        "message": err.to_string(),
        "details": err,
    }))?;
    Ok(if err.is_client_error() {
        ExitCode::from(1)
    } else {
        ExitCode::from(2)
    })
}
