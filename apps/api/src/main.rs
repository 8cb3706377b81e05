//! # Galley API Server
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. tracing-subscriber (RUST_LOG, default info)                         │
//! │  2. ApiConfig::load() from environment                                  │
//! │  3. SQLite pool + migrations                                            │
//! │  4. Redis cache / pub-sub if REDIS_URL is set, else in-process          │
//! │  5. axum::serve with graceful shutdown on Ctrl+C / SIGTERM             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use galley_api::{router, ApiConfig, AppState};
use galley_db::Database;
use galley_relay::{
    Broadcaster, CacheStore, ChannelBroadcaster, MemoryCache, RedisBroadcaster, RedisCache,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("Starting Galley API server...");

    let config = ApiConfig::load()?;
    info!(
        port = config.port,
        database = %config.database_path.display(),
        stock_policy = %config.stock_policy,
        "Configuration loaded"
    );

    let db = Database::new(config.db_config()).await?;
    info!("Database ready");

    let (cache, broadcaster) = connect_relay(config.redis_url.as_deref()).await;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(db.clone(), cache, broadcaster, config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=galley=trace` - Show trace for galley crates only
/// - Default: INFO level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

/// Redis when configured and reachable, otherwise in-process backends.
async fn connect_relay(redis_url: Option<&str>) -> (Arc<dyn CacheStore>, Arc<dyn Broadcaster>) {
    let Some(url) = redis_url else {
        info!("REDIS_URL not set; using in-process cache and broadcaster");
        return (Arc::new(MemoryCache::new()), Arc::new(ChannelBroadcaster::default()));
    };

    let cache: Arc<dyn CacheStore> = match RedisCache::connect(url).await {
        Ok(cache) => {
            info!("Connected to Redis cache");
            Arc::new(cache)
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to Redis cache, continuing in-process");
            Arc::new(MemoryCache::new())
        }
    };

    let broadcaster: Arc<dyn Broadcaster> = match RedisBroadcaster::connect(url).await {
        Ok(broadcaster) => Arc::new(broadcaster),
        Err(e) => {
            warn!(error = %e, "Failed to connect to Redis pub/sub, continuing in-process");
            Arc::new(ChannelBroadcaster::default())
        }
    };

    (cache, broadcaster)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
