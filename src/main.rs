use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod actions;
mod db;
mod error;
mod http;
mod models;
mod pipeline;
mod risk;

#[derive(Parser)]
#[command(name = "retention-engine")]
#[command(about = "Retention risk action engine for AqlHR", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import risk score rows from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Run the action-plan pipeline once for a tenant
    Generate {
        #[arg(long)]
        tenant: uuid::Uuid,
        /// One of: overall, dept, project, grade
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        scope_id: Option<String>,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "0.0.0.0:8787")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted for tenant {}.", db::SEED_TENANT_ID);
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} risk scores from {}.", csv.display());
        }
        Commands::Generate {
            tenant,
            scope,
            scope_id,
        } => {
            let scope = models::RiskScope::from_request(scope.as_deref(), scope_id.as_deref())?;
            let outcome = pipeline::run_pipeline(
                &pool,
                &pipeline::GenerateParams {
                    tenant_id: tenant,
                    scope,
                },
            )
            .await?;

            println!("{}", outcome.summary_message());
            if let Some(driver) = &outcome.top_driver {
                println!("Top driver: {driver}");
            }
        }
        Commands::Serve { bind } => {
            http::serve(pool, &bind).await?;
        }
    }

    Ok(())
}
