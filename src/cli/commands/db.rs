use anyhow::Context;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;
use crate::database::DatabaseManager;

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Create tables, unique indexes and format checks (idempotent)")]
    Migrate,

    #[command(about = "Verify the database is reachable")]
    Check,
}

pub async fn handle(cmd: DbCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let db_config = &config::config().database;
    let pool = DatabaseManager::connect(db_config)
        .await
        .context("could not connect; is DATABASE_URL set?")?;

    match cmd {
        DbCommands::Migrate => {
            DatabaseManager::run_migrations(&pool).await?;
            output_success(&output_format, "Schema applied", None)
        }
        DbCommands::Check => {
            DatabaseManager::health_check(&pool).await?;
            output_success(
                &output_format,
                "Database reachable",
                Some(json!({ "max_connections": db_config.max_connections })),
            )
        }
    }
}
