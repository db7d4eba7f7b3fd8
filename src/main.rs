use anyhow::Context;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use collection_market_backend::auth::SessionVerifier;
use collection_market_backend::config::AppConfig;
use collection_market_backend::routes::build_router;
use collection_market_backend::services::escrow::{EscrowClient, EscrowLedger};
use collection_market_backend::services::valuation::{OpenAiClient, ValuationService};
use collection_market_backend::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,collection_market_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env().context("Invalid configuration")?;

    // Connect to database
    tracing::info!("Connecting to database...");
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(config.database_max_connections)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .context("Failed to connect to database")?;

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .context("Failed to run migrations")?;

    let sessions = SessionVerifier::new(
        &config.session_key,
        config.session_issuer.as_deref(),
        config.session_cache_ttl,
    )
    .context("Invalid session key")?;

    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set, valuation requests will fail");
    }
    let valuation = ValuationService::new(Arc::new(OpenAiClient::new(
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
        config.valuation_model.clone(),
    )));

    let escrow: Option<Arc<dyn EscrowLedger>> = match &config.escrow {
        Some(escrow_config) if escrow_config.verify_transactions => {
            let client = EscrowClient::new(escrow_config).context("Invalid escrow configuration")?;
            match client.chain_id().await {
                Ok(chain_id) => tracing::info!(chain_id, "Escrow RPC reachable"),
                Err(e) => tracing::warn!(error = %e, "Escrow RPC not reachable yet"),
            }
            Some(Arc::new(client))
        }
        Some(_) => {
            tracing::warn!("Escrow receipt verification disabled");
            None
        }
        None => {
            tracing::warn!("ESCROW_RPC_URL is not set, on-chain verification disabled");
            None
        }
    };

    tracing::info!(relist_policy = ?config.relist_policy, "Relist policy");

    let bind_address = config.bind_address();
    let state = AppState {
        db: db.clone(),
        config: Arc::new(config),
        sessions,
        valuation,
        escrow,
    };

    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, closing database connection");
    db.close().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
