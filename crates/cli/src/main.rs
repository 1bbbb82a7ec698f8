//! Tiendita CLI - password and user management tools.
//!
//! # Usage
//!
//! ```bash
//! # Print the digest stored for a password
//! tiendita-cli hash 'S3cret!pass'
//!
//! # Check a password against the registration policy
//! tiendita-cli check-password 'S3cret!pass'
//!
//! # Create a user (the only way to create administrators)
//! tiendita-cli user create -u maria -p 'S3cret!pass' -r admin
//!
//! # Validate the environment
//! tiendita-cli config check
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tiendita-cli")]
#[command(author, version, about = "Tiendita CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SHA-256 digest of a password
    Hash {
        /// Plaintext password
        password: String,
    },
    /// Check a password against the registration policy
    CheckPassword {
        /// Plaintext password
        password: String,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Username
        #[arg(short, long)]
        username: String,

        /// Plaintext password (must meet the policy)
        #[arg(short, long)]
        password: String,

        /// Role (`admin` or `customer`)
        #[arg(short, long, default_value = "customer")]
        role: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Load and validate the environment
    Check,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Hash { password } => {
            commands::password::hash(&password);
        }
        Commands::CheckPassword { password } => commands::password::check(&password)?,
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                password,
                role,
            } => {
                commands::user::create(&username, &password, &role).await?;
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::Check => {
                commands::config::check()?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_user_create_defaults_to_customer() {
        let cli = Cli::try_parse_from(["tiendita-cli", "user", "create", "-u", "ana", "-p", "x"])
            .expect("parse");
        match cli.command {
            Commands::User {
                action: UserAction::Create { role, .. },
            } => assert_eq!(role, "customer"),
            _ => panic!("expected user create"),
        }
    }
}
