//! # Seed Data Generator
//!
//! Creates demo users and replays the sample ledger scenario for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./coffer_dev.db (default)
//! cargo run -p coffer-db --bin seed
//!
//! # Specify database path
//! cargo run -p coffer-db --bin seed -- --db ./data/coffer.db
//!
//! # Load limits and hashing cost from a config file
//! cargo run -p coffer-db --bin seed -- --config ./coffer.toml
//! ```
//!
//! ## Generated Data
//! - Bootstrap administrator (`admin`, user 1, no account)
//! - `alice` with account `AC00000002`
//! - `bob` with account `AC00000003`, funded with 1000.00, then:
//!   deposit 500.00, withdraw 2000.00 (refused), transfer 300.00 to alice
//!
//! All demo users log in with the password `password1`.

use std::env;
use std::path::PathBuf;

use coffer_core::{Money, PinHasher};
use coffer_db::{AuthService, Database, IntoOutcome, LedgerConfig, LedgerEngine, QueryService};
use tracing_subscriber::EnvFilter;

const DEMO_PASSWORD: &str = "password1";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Coffer Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (default: ./coffer_dev.db)");
                println!("  -c, --config <PATH>   TOML config file");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = LedgerConfig::load(config_path.as_deref())?;
    config.database.path = db_path.unwrap_or_else(|| PathBuf::from("./coffer_dev.db"));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.logging.filter))?,
        )
        .init();

    println!("🌱 Coffer Seed Data Generator");
    println!("=============================");
    println!("Database: {}", config.database.path.display());
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let hasher = PinHasher::new(config.pin_policy());
    let auth = AuthService::new(db.clone(), hasher.clone());
    let engine = LedgerEngine::new(db.clone(), config.operation_limits(), hasher);
    let queries = QueryService::new(db.clone());

    if auth.bootstrap_admin(&config.bootstrap).await? {
        println!("✓ Created administrator '{}'", config.bootstrap.admin_username);
    }

    let existing = queries.list_all_users().await?;
    if existing.iter().any(|u| u.username == "alice") {
        println!("⚠ Database already has demo users");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let (_, alice) = auth
        .register("alice", DEMO_PASSWORD, Some("Alice Example"), None)
        .await?;
    let (_, bob) = auth
        .register("bob", DEMO_PASSWORD, Some("Bob Example"), None)
        .await?;
    println!("✓ Registered alice ({})", alice.account_number);
    println!("✓ Registered bob ({})", bob.account_number);

    // Replay the sample scenario on bob's account
    println!();
    println!("Replaying scenario on {}...", bob.account_number);

    engine
        .deposit(bob.id, Money::from_major(1000), Some("Opening balance"))
        .await?;
    print_step(&queries, bob.id, "opening deposit 1000.00").await?;

    let steps = [
        (
            "deposit 500.00",
            engine.deposit(bob.id, Money::from_major(500), None).await,
        ),
        (
            "withdraw 2000.00",
            engine.withdraw(bob.id, Money::from_major(2000), None).await,
        ),
        (
            "transfer 300.00",
            engine
                .transfer(bob.id, &alice.account_number, Money::from_major(300), None)
                .await,
        ),
    ];

    for (label, result) in steps {
        let outcome = result.into_outcome();
        let mark = if outcome.success { "✓" } else { "✗" };
        println!("  {} {}: {}", mark, label, outcome.message);
        print_step(&queries, bob.id, label).await?;
    }

    println!();
    println!(
        "  alice balance: {}",
        queries.get_balance(alice.id).await?
    );
    println!(
        "  bob history:   {} entries",
        queries.list_transactions(bob.id, None).await?.len()
    );

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

async fn print_step(
    queries: &QueryService,
    account_id: i64,
    label: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let balance = queries.get_balance(account_id).await?;
    println!("    balance after {}: {}", label, balance);
    Ok(())
}
