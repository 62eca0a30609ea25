//! Database Config

use clap::Args;

/// Database settings.
#[derive(Debug, Clone, Args)]
pub struct DatabaseConfig {
    /// `SQLite` connection string; `sqlite::memory:` for a throwaway database
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://tome.db", global = true)]
    pub database_url: String,
}
