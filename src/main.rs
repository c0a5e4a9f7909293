// src/main.rs
use health_wallet::{config::Config, config::RECOMMENDED_SECRET_LEN, create_router, db, state::AppState};
use std::env;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Logging ---
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            env::var("RUST_LOG")
                .unwrap_or_else(|_| "health_wallet=debug,tower_http=info,sqlx=warn".into())
                .into()
        }))
        .with(fmt::layer())
        .init();

    tracing::info!("🚀 Starting Health Wallet API...");

    // --- Configuration ---
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    if config.auth.jwt_secret.len() < RECOMMENDED_SECRET_LEN {
        tracing::warn!("⚠️ JWT_SECRET is short, consider a longer random value!");
    }
    tokio::fs::create_dir_all(&config.storage.upload_dir).await?;
    tracing::info!("📁 Storing uploads in {}", config.storage.upload_dir.display());

    // --- Database ---
    let db_pool = match db::create_db_pool(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("❌ Failed to initialise the database: {}", e);
            return Err(anyhow::anyhow!("Database connection/migration failed: {}", e));
        }
    };

    // --- Listener ---
    let addr = config.socket_addr()?;
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("❌ Could not listen on {}: {}", addr, e);
            return Err(e.into());
        }
    };
    tracing::info!("📡 Listening on http://{}", addr);

    let app_state = AppState::new(db_pool.clone(), config);
    let app = create_router(app_state);

    // --- Serve until a shutdown signal, then close the store ---
    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    tracing::info!("Closing database pool...");
    db_pool.close().await;

    if let Err(e) = served {
        tracing::error!("❌ Fatal server error: {}", e);
        return Err(e.into());
    }
    tracing::info!("👋 Shut down cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received.");
}
