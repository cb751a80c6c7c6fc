mod api;
mod config;
mod db;
mod settings;
mod websocket;

use std::sync::Arc;

use axum::Router;
use openscale_store::{MemoryEeprom, SettingsStore};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::settings::SharedStore;

/// Shared application state
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub store: SharedStore,
    /// Broadcast channel for UI updates
    pub ui_broadcast: broadcast::Sender<String>,
}

/// Build the application router
pub fn app(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .nest("/api", api::router())
        .nest("/ws", websocket::router())
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "openscale_server=debug,openscale_store=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Connect to database
    let db = db::connect(&config.database_url).await?;

    // Run migrations
    db::migrate(&db).await?;

    // Load the EEPROM image, defaulting it on first boot
    let image = db::load_image(&db, config.eeprom_size).await?;
    let eeprom = MemoryEeprom::from_image(&image, config.eeprom_size);
    let mut store = SettingsStore::open(eeprom, config.layout)?;
    let settings = store.load_or_reset();
    db::save_image(&db, &store.image()).await?;
    tracing::info!("Settings loaded ({} layout): {:?}", config.layout, settings);

    // Create broadcast channel for UI updates
    let (ui_broadcast, _) = broadcast::channel(100);

    // Create shared state
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        store: SharedStore::new(store),
        ui_broadcast,
    });

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!("OpenScale settings server listening on {}", config.bind_address);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
