//! # Coffer CLI Entry Point
//!
//! ```bash
//! coffer register alice secret1 --name "Alice Example"
//! coffer deposit 2 500.00 --note Salary
//! coffer transfer 2 AC00000003 120.50
//! coffer --json history 2 --limit 10
//! coffer audit --user admin --password admin123
//! ```
//!
//! The actual setup is in lib.rs for testability.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    coffer_cli::run(std::env::args().skip(1)).await
}
