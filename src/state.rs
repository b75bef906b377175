use migration::{Migrator, MigratorTrait};

use crate::{prelude::*, sv};

/// Explicit service configuration, read once at startup and injected
/// here. No ambient globals.
#[derive(Clone, Debug)]
pub struct Config {
  /// Shared credential required on every non-admin write endpoint.
  pub api_key: String,
  /// Elevated credential for batch issuance and reporting.
  pub admin_key: String,
  /// Secret mixed into generated user tokens.
  pub server_secret: String,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
}

impl AppState {
  pub async fn new(db_url: &str, config: Config) -> anyhow::Result<Self> {
    let db = Database::connect(db_url).await?;
    Migrator::up(&db, None).await?;
    Ok(Self { db, config })
  }

  pub fn activation(&self) -> sv::Activation<'_> {
    sv::Activation::new(&self.db, &self.config.server_secret)
  }
}
