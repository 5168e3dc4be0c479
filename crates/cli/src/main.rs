//! Planbe CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! planbe-cli migrate
//!
//! # Load or refresh the product catalog
//! planbe-cli seed products crates/cli/data/products.yaml
//!
//! # Create a customer account (password read from PLANBE_NEW_USER_PASSWORD)
//! planbe-cli user create -u ana -e ana@example.com -n Ana -s Ruiz
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed products` - Upsert catalog products from YAML
//! - `user create` - Create an account without the sign-up email

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "planbe-cli")]
#[command(author, version, about = "Planbe CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database from YAML files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage customer accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert or update catalog products
    Products {
        /// Path to the products YAML file
        file: String,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new account
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// First name
        #[arg(short, long)]
        name: String,

        /// Surname
        #[arg(short, long)]
        surname: String,

        /// Account type
        #[arg(short = 't', long = "type", default_value = "customer")]
        kind: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products { file } => commands::seed::products(&file).await?,
        },
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                name,
                surname,
                kind,
            } => {
                commands::user::create(&username, &email, &name, &surname, &kind).await?;
            }
        },
    }
    Ok(())
}
