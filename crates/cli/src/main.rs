//! Bika CLI - database migrations and bootstrap tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bika-cli migrate
//!
//! # Create a unit
//! bika-cli unit create -n "Northern Province" -c NP
//!
//! # Create a vendor in that unit
//! bika-cli user create -u kamana -t vendor -U "Northern Province"
//!
//! # Create a category
//! bika-cli category create -n Coffee
//! ```
//!
//! # Environment Variables
//!
//! - `BIKA_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bika-cli")]
#[command(author, version, about = "Bika CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage units
    Unit {
        #[command(subcommand)]
        action: UnitAction,
    },
    /// Manage accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage product categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
}

#[derive(Subcommand)]
enum UnitAction {
    /// Create a new unit
    Create {
        /// Unit name
        #[arg(short, long)]
        name: String,

        /// Optional short code
        #[arg(short, long)]
        code: Option<String>,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new account
    Create {
        /// Login name, unique
        #[arg(short, long)]
        username: String,

        /// Contact email
        #[arg(short, long)]
        email: Option<String>,

        /// Role (`staff`, `commander`, `admin`)
        #[arg(short, long, default_value = "staff")]
        role: String,

        /// Account type (`customer`, `vendor`, `admin`)
        #[arg(short = 't', long = "type", default_value = "customer")]
        user_type: String,

        /// Name of the unit the account belongs to
        #[arg(short = 'U', long)]
        unit: Option<String>,

        /// Grant superuser access
        #[arg(long)]
        superuser: bool,
    },
}

#[derive(Subcommand)]
enum CategoryAction {
    /// Create a category (no-op if the name exists)
    Create {
        /// Category name
        #[arg(short, long)]
        name: String,
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

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    let pool = commands::connect().await?;

    match cli.command {
        Commands::Migrate => commands::migrate::run(&pool).await?,
        Commands::Unit {
            action: UnitAction::Create { name, code },
        } => {
            commands::accounts::create_unit(&pool, &name, code.as_deref()).await?;
        }
        Commands::User {
            action:
                UserAction::Create {
                    username,
                    email,
                    role,
                    user_type,
                    unit,
                    superuser,
                },
        } => {
            let request = commands::accounts::UserRequest {
                username: &username,
                email: email.as_deref(),
                role: &role,
                user_type: &user_type,
                unit: unit.as_deref(),
                superuser,
            };
            commands::accounts::create_user(&pool, &request).await?;
        }
        Commands::Category {
            action: CategoryAction::Create { name },
        } => {
            commands::catalog::create_category(pool, &name).await?;
        }
    }
    Ok(())
}
