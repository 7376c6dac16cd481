//! Marquee CLI - database migrations and administrator management.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! mq-cli migrate
//!
//! # Create an administrator
//! mq-cli admin create -e admin@example.com -f Ana -l Lopez -p 5551234 --password '...'
//!
//! # Grant or revoke ADMIN on an existing customer
//! mq-cli admin grant -e ana@example.com
//! mq-cli admin revoke -e ana@example.com
//! ```
//!
//! Reads `MARQUEE_DATABASE_URL` (or `DATABASE_URL`), from `.env` if present.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mq-cli")]
#[command(author, version, about = "Marquee CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage administrators
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new customer with the USER and ADMIN roles
    Create {
        /// Email address (unique)
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        first_name: String,

        #[arg(short, long)]
        last_name: String,

        #[arg(short, long, default_value = "")]
        phone: String,

        /// Initial password (at least 8 characters)
        #[arg(long)]
        password: String,
    },
    /// Grant ADMIN to an existing customer
    Grant {
        #[arg(short, long)]
        email: String,
    },
    /// Revoke ADMIN from an existing customer
    Revoke {
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                first_name,
                last_name,
                phone,
                password,
            } => {
                let id = commands::admin::create_admin(&commands::admin::NewAdmin {
                    email: &email,
                    first_name: &first_name,
                    last_name: &last_name,
                    phone: &phone,
                    password: &password,
                })
                .await?;
                tracing::info!(customer_id = %id, "Done");
            }
            AdminAction::Grant { email } => {
                let roles = commands::admin::grant(&email).await?;
                tracing::info!(roles = %roles.to_db_string(), "Done");
            }
            AdminAction::Revoke { email } => {
                let roles = commands::admin::revoke(&email).await?;
                tracing::info!(roles = %roles.to_db_string(), "Done");
            }
        },
    }
    Ok(())
}
