use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};

use crate::auth::TokenVerifier;
use crate::config;
use crate::database::{DatabaseManager, PgReviewCardStore};
use crate::services::{PassOutcome, ReactivationScheduler};

#[derive(Parser)]
#[command(name = "recall")]
#[command(about = "Recall CLI - maintenance tasks for the Recall API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run one card reactivation pass against the database")]
    Reactivate,

    #[command(about = "Verify a bearer token and print its claims as JSON")]
    VerifyToken {
        #[arg(help = "Token to verify")]
        token: String,
    },

    #[command(about = "Fetch the signing key set and list usable key ids")]
    Jwks,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::config();

    match cli.command {
        Commands::Reactivate => {
            let database = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to database")?;
            let scheduler = ReactivationScheduler::new(Arc::new(PgReviewCardStore::new(database.pool().clone())));

            let outcome = scheduler.run_once(Utc::now()).await;
            database.close().await;

            match outcome? {
                PassOutcome::Completed { scanned, reactivated } => {
                    println!("Scanned {} dormant card(s), reactivated {}", scanned, reactivated);
                }
                PassOutcome::Skipped => println!("Another pass is running; nothing done"),
            }
            Ok(())
        }
        Commands::VerifyToken { token } => {
            config.auth.validate()?;
            let verifier = TokenVerifier::from_config(&config.auth)?;
            let claims = verifier.verify(token.trim()).await?;
            println!("{}", serde_json::to_string_pretty(&claims)?);
            Ok(())
        }
        Commands::Jwks => {
            config.auth.validate()?;
            let verifier = TokenVerifier::from_config(&config.auth)?;
            let count = verifier.key_cache().refresh().await?;
            println!("{} usable key(s) at {}", count, config.auth.jwks_url());
            for kid in verifier.key_cache().key_ids().await {
                println!("  {}", kid);
            }
            Ok(())
        }
    }
}
