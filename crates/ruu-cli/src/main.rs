//! RUU CLI - Operator command-line interface
//!
//! Usage:
//!   ruu migrate
//!   ruu create-admin --email <email> --name <name> --phone <phone> --password <password>
//!   ruu config

use anyhow::Context;
use clap::{Parser, Subcommand};
use ruu_api::auth::{AuthService, JwtConfig, MemorySessionStore, PasswordConfig, RegisterRequest, TokenService};
use ruu_core::{AppConfig, PgStore, UserRole};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ruu")]
#[command(about = "RUU Properties operator CLI")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(long, global = true, env = "RUU_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create an administrator account
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        /// Falls back to RUU_ADMIN_PASSWORD so it stays out of shell history
        #[arg(long, env = "RUU_ADMIN_PASSWORD")]
        password: String,
    },
    /// Print the effective configuration with secrets masked
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ruu=info,ruu_core=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Migrate => {
            let store = PgStore::connect(&config.database)
                .await
                .context("connecting to PostgreSQL")?;
            store.migrate().await.context("running migrations")?;
            println!("Migrations applied");
        }
        Commands::CreateAdmin {
            email,
            name,
            phone,
            password,
        } => {
            let store = PgStore::connect(&config.database)
                .await
                .context("connecting to PostgreSQL")?;

            // Registration never touches the session cache
            let tokens = TokenService::new(
                JwtConfig::from(&config.auth),
                Arc::new(MemorySessionStore::new()),
            );
            let auth = AuthService::new(Arc::new(store), tokens, PasswordConfig::default());

            let user = auth
                .register(RegisterRequest {
                    name,
                    email,
                    confirmation_password: password.clone(),
                    password,
                    phone_number: phone,
                    role: Some(UserRole::Admin),
                    image: None,
                })
                .await
                .context("creating admin account")?;

            println!("Created admin {} ({})", user.email, user.uuid);
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)
            .and_then(AppConfig::with_env_override)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => AppConfig::from_env().context("loading configuration from environment")?,
    };
    Ok(config)
}
