//! # Taskboard API Server
//!
//! REST and WebSocket server for projects, tasks, comments and
//! notifications.
//!
//! ## Architecture
//!
//! The API server is built with Axum and provides:
//! - Account registration, password login and Google sign-in
//! - Project, task and comment CRUD with role/ownership checks
//! - Per-user notifications and dashboard aggregates
//! - Live task and notification events over WebSocket rooms
//!
//! With `REDIS_URL` set, events are relayed through Redis pub/sub so every
//! server process delivers them to its own sockets.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=memory JWT_SECRET=dev cargo run -p taskboard-api
//! ```

use std::sync::Arc;
use std::time::Duration;
use taskboard_api::{
    app::{build_router, AppState},
    config::Config,
    relay::{spawn_subscriber, RedisRelay},
    ws::{start_heartbeat, Hub},
};
use taskboard_shared::{
    auth::identity::GoogleVerifier,
    db::pool::DatabaseConfig,
    events::EventPublisher,
    store::{MemoryStore, PgStore, Store},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!(
        "Taskboard API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    if config.auth.jwt_secret.is_none() {
        tracing::warn!("JWT_SECRET is not set; authenticated requests will fail");
    }

    let store: Arc<dyn Store> = if config.database.is_memory() {
        tracing::warn!("Using in-memory store; data is lost on restart");
        Arc::new(MemoryStore::new())
    } else {
        let store = PgStore::connect(DatabaseConfig {
            url: config.database.url.clone(),
            max_connections: config.database.max_connections,
            ..Default::default()
        })
        .await?;
        Arc::new(store)
    };

    let hub = Arc::new(Hub::new());

    let mut subscriber = None;
    let events: Arc<dyn EventPublisher> = match &config.realtime.redis_url {
        Some(url) => {
            let relay = RedisRelay::connect(url).await?;
            subscriber = Some(spawn_subscriber(url.clone(), hub.clone()));
            tracing::info!("Live events relayed through Redis");
            Arc::new(relay)
        }
        None => hub.clone(),
    };

    let mut state = AppState::with_publisher(store, events, hub.clone(), config.clone());

    if let Some(client_id) = &config.auth.google_client_id {
        state = state.with_verifier(Arc::new(GoogleVerifier::new(
            client_id.clone(),
            config.auth.google_tokeninfo_url.clone(),
        )));
    } else {
        tracing::info!("GOOGLE_CLIENT_ID is not set; Google login disabled");
    }

    let heartbeat = start_heartbeat(
        hub.clone(),
        Duration::from_secs(config.realtime.heartbeat_secs),
    );

    let app = build_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        environment = %config.api.environment,
        "Server listening on http://{}",
        address
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    hub.shutdown_all().await;
    heartbeat.abort();
    if let Some(subscriber) = subscriber {
        subscriber.abort();
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// Sets up the subscriber; `LOG_FORMAT=json` switches to JSON lines
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "taskboard_api=debug,taskboard_shared=debug,tower_http=info".into()
    });

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let (json_layer, plain_layer) = if json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
