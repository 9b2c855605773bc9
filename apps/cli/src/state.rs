//! Services shared by every command.

use tracing::info;

use crate::error::{CliError, CliResult};
use coffer_core::{PinHasher, User};
use coffer_db::{AuthService, Database, LedgerConfig, LedgerEngine, QueryService};

/// Everything a command can reach.
///
/// Built once per process from the loaded configuration.
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: LedgerEngine,
    pub queries: QueryService,
    pub auth: AuthService,
    db: Database,
}

impl AppState {
    /// Connects, migrates and ensures the bootstrap administrator exists.
    pub async fn open(config: &LedgerConfig) -> CliResult<Self> {
        let db = Database::new(config.db_config()).await?;
        let hasher = PinHasher::new(config.pin_policy());

        let state = AppState {
            engine: LedgerEngine::new(db.clone(), config.operation_limits(), hasher.clone()),
            queries: QueryService::new(db.clone()),
            auth: AuthService::new(db.clone(), hasher),
            db,
        };

        state.auth.bootstrap_admin(&config.bootstrap).await?;
        info!(path = ?config.database.path, "Ledger ready");
        Ok(state)
    }

    /// Authenticates the caller and requires the admin role.
    pub async fn require_admin(&self, username: &str, password: &str) -> CliResult<User> {
        match self.auth.authenticate(username, password).await? {
            Some(user) if user.is_admin() => Ok(user),
            Some(_) => Err(CliError::Forbidden(format!(
                "'{}' is not an administrator",
                username
            ))),
            None => Err(CliError::Forbidden("Invalid username or password".into())),
        }
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}
