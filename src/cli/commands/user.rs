use anyhow::Context;
use clap::Subcommand;
use serde_json::json;
use std::sync::Arc;

use crate::auth::hash_password;
use crate::cli::utils::{output_fields, output_success};
use crate::cli::OutputFormat;
use crate::config;
use crate::database::{DatabaseManager, PgStore};
use crate::services::UserService;
use crate::types::{Region, Role};

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create an account directly in the database")]
    Create {
        #[arg(long, help = "Login name (at least 6 characters)")]
        username: String,

        #[arg(long, help = "Password (at least 6 characters)")]
        password: String,

        #[arg(long, default_value = "user", help = "admin or user")]
        role: Role,

        #[arg(long, help = "KRO, MRO, BRO or NBRO; required for role user")]
        region: Option<Region>,
    },

    #[command(about = "Print the argon2 PHC hash of a password")]
    HashPassword {
        #[arg(help = "Password to hash")]
        password: String,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::Create {
            username,
            password,
            role,
            region,
        } => {
            let app_config = config::config();
            let pool = DatabaseManager::connect(&app_config.database)
                .await
                .context("could not connect; is DATABASE_URL set?")?;
            let service = UserService::new(Arc::new(PgStore::new(pool)), &app_config.security);

            let user = service
                .create_account(&username, &password, role, region)
                .await?;

            if let OutputFormat::Text = output_format {
                output_fields(&[
                    ("id", user.id.to_string()),
                    ("username", user.username.clone()),
                    ("role", user.role.to_string()),
                    ("region", user.region.map(|r| r.to_string()).unwrap_or_else(|| "-".into())),
                ]);
            }
            output_success(&output_format, "User created", Some(json!({ "user": user })))
        }
        UserCommands::HashPassword { password } => {
            let hash = hash_password(&password)?;
            match output_format {
                OutputFormat::Text => {
                    println!("{}", hash);
                    Ok(())
                }
                OutputFormat::Json => output_success(&output_format, "Password hashed", Some(json!({ "hash": hash }))),
            }
        }
    }
}
