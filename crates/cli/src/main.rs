//! Kruuse CLI - environment checks, migrations, seeding and store diagnostics.
//!
//! # Usage
//!
//! ```bash
//! # Verify the environment before starting the storefront
//! kruuse check-env
//!
//! # Apply catalog migrations to the direct database
//! kruuse migrate
//!
//! # Load regions and products from a YAML file
//! kruuse seed fixtures/catalog.yaml
//!
//! # Run the adapter smoke checks
//! kruuse smoke
//!
//! # Show the country -> region map
//! kruuse regions
//!
//! # Issue a single store request
//! kruuse fetch GET /store/products -q limit=3 -q region_id=reg_cl
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "kruuse")]
#[command(author, version, about = "Kruuse storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check required environment variables
    CheckEnv,
    /// Run database migrations against `STOREFRONT_DATABASE_URL`
    Migrate,
    /// Seed the data store from a YAML file
    Seed {
        /// Path to the YAML seed file
        file: String,
    },
    /// Run the adapter diagnostics and print the report
    Smoke,
    /// Print the resolved country to region map
    Regions,
    /// Send one request through the store adapter
    Fetch {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,

        /// Store path, e.g. `/store/products/gauze`
        path: String,

        /// Query parameter as `key=value` (repeatable)
        #[arg(short, long = "query", value_parser = commands::store::parse_query_pair)]
        query: Vec<(String, String)>,

        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kruuse_cli=info,kruuse_storefront=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::CheckEnv => commands::check_env::run()?,
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(&file).await?,
        Commands::Smoke => commands::store::smoke().await?,
        Commands::Regions => commands::store::regions().await?,
        Commands::Fetch {
            method,
            path,
            query,
            body,
        } => commands::store::fetch(&method, &path, query, body.as_deref()).await?,
    }
    Ok(())
}
