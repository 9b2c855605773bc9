//! # Coffer CLI
//!
//! Command-line shell over the ledger services.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          coffer <command>                               │
//! │                                                                         │
//! │  1. Parse arguments (clap) ───────────────────────────────────────────► │
//! │     • usage errors and --help stop here, before any I/O                 │
//! │                                                                         │
//! │  2. Load LedgerConfig ────────────────────────────────────────────────► │
//! │     • --config PATH (TOML), then COFFER_* environment overrides         │
//! │                                                                         │
//! │  3. Initialize Logging ───────────────────────────────────────────────► │
//! │     • tracing-subscriber on stderr                                      │
//! │     • RUST_LOG, else [logging].filter                                   │
//! │                                                                         │
//! │  4. Open AppState ────────────────────────────────────────────────────► │
//! │     • pool + migrations, bootstrap administrator                        │
//! │                                                                         │
//! │  5. Execute & print ──────────────────────────────────────────────────► │
//! │     • text lines, or JSON with --json                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod error;
pub mod state;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use coffer_db::LedgerConfig;
use commands::{Cli, Printer};
use error::{CliError, CliResult};
use state::AppState;

/// Runs the CLI with the arguments after the program name.
pub async fn run(raw: impl IntoIterator<Item = String>) -> ExitCode {
    let argv = std::iter::once("coffer".to_string()).chain(raw);
    let cli = match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            // --help / --version
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            let _ = err.print();
            return CliError::from(err).exit_code();
        }
    };

    let printer = Printer::new(cli.json);
    match try_run(cli, &printer).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            let code = err.exit_code();
            printer.error(err);
            code
        }
    }
}

async fn try_run(cli: Cli, printer: &Printer) -> CliResult<bool> {
    let config = LedgerConfig::load(cli.config.as_deref())?;
    init_tracing(&config)?;

    let state = AppState::open(&config).await?;
    let result = commands::execute(&state, cli.command, printer).await;
    state.close().await;
    result
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=coffer_db=trace` - Show trace for the ledger store only
/// - Default: `[logging].filter` from config (`info`)
fn init_tracing(config: &LedgerConfig) -> CliResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.logging.filter)
            .map_err(|e| CliError::Startup(format!("invalid log filter: {}", e)))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| CliError::Startup(e.to_string()))
}
