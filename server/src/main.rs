//! Bailiff Server - Main Entry Point

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use bailiff_server::platform::{OfflinePlatform, PlatformRoles, TelegramRoles};
use bailiff_server::{api, config, db};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bailiff_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        global_owner = config.global_owner_id.is_some(),
        "Starting Bailiff Server"
    );

    // Initialize database
    let db_pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&db_pool).await?;

    // Live platform roles (optional - without a token every role is unknown)
    let platform: Arc<dyn PlatformRoles> = match &config.platform_bot_token {
        Some(token) => {
            let client = TelegramRoles::new(
                &config.platform_api_url,
                token,
                Duration::from_secs(config.platform_timeout_secs),
            )?;
            info!(api = %config.platform_api_url, "Platform role lookups enabled");
            Arc::new(client)
        }
        None => {
            warn!("PLATFORM_BOT_TOKEN not set. Platform roles will be reported as unknown.");
            Arc::new(OfflinePlatform)
        }
    };

    // Build application state
    let state = api::AppState::new(db_pool, config.clone(), platform);

    // Bound the activity map and the denylist cache
    let activity = Arc::clone(&state.activity);
    let denylist = Arc::clone(&state.denylist);
    let prune_every = Duration::from_secs(config.activity_prune_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(prune_every);
        loop {
            ticker.tick().await;
            let pruned = activity.prune();
            if pruned > 0 {
                debug!(pruned, remaining = activity.tracked(), "Activity marks pruned");
            }
            let expired = denylist.prune();
            if expired > 0 {
                debug!(expired, remaining = denylist.cached(), "Denylist cache pruned");
            }
        }
    });

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
