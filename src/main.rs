use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use recall_api::auth::TokenVerifier;
use recall_api::config;
use recall_api::database::{DatabaseManager, PgActivityStore, PgReviewCardStore, PgUserStore};
use recall_api::services::{ReactivationScheduler, StreakService};
use recall_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, AUTH_INSTANCE_DOMAIN, etc.
    let _ = dotenvy::dotenv();
    recall_api::init_tracing();

    let config = config::config();
    config.auth.validate()?;
    tracing::info!("Starting Recall API in {:?} mode", config.environment);

    let database = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    let pool = database.pool().clone();

    let verifier = TokenVerifier::from_config(&config.auth)?;
    tracing::info!("Verifying tokens against {}", config.auth.jwks_url());

    let scheduler = Arc::new(ReactivationScheduler::new(Arc::new(PgReviewCardStore::new(pool.clone()))));
    let reactivation = if config.scheduler.enabled {
        let interval = Duration::from_secs(config.scheduler.reactivation_interval_secs);
        tracing::info!("Card reactivation every {:?}", interval);
        Some(scheduler.clone().spawn(interval))
    } else {
        None
    };

    let state = Arc::new(AppState {
        verifier,
        users: Arc::new(PgUserStore::new(pool.clone())),
        streaks: StreakService::new(Arc::new(PgActivityStore::new(pool))),
        database: Some(database.clone()),
    });

    // Allow tests or deployments to override port via env
    let port = std::env::var("RECALL_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Recall API listening on http://{}", bind_addr);

    axum::serve(listener, recall_api::routes::app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server error")?;

    if let Some(handle) = reactivation {
        handle.abort();
    }
    database.close().await;
    Ok(())
}
