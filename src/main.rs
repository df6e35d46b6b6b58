mod api;
mod config;
mod handlers;
mod models;
mod services;

#[cfg(feature = "http-server")]
use api::server::{create_router, AppState};

use anyhow::Result;
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;

use config::Config;
use handlers::ScanHandler;
use models::ScanResult;
use services::{
    dietary_hint, Database, HistoryStore, ImageInput, MemoryStorage, OpenRouterService,
    SnapshotStorage, VisionService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Load environment variables
    dotenv().ok();

    let config = Config::from_env()?;

    let vision: Arc<dyn VisionService> = Arc::new(OpenRouterService::new(
        config.openrouter_api_key.clone(),
        config.openrouter_model.clone(),
        config.openrouter_base_url.clone(),
    ));
    log::info!("✅ OpenRouter service initialized with model: {}", config.openrouter_model);

    let storage: Arc<dyn SnapshotStorage> = match &config.database_url {
        Some(url) => {
            let db = Database::new(url).await?;
            log::info!("✅ PostgreSQL storage initialized");
            Arc::new(db)
        }
        None => {
            log::warn!("⚠️ DATABASE_URL not set, history is kept in memory only");
            Arc::new(MemoryStorage::new())
        }
    };
    let history = Arc::new(HistoryStore::new(storage));

    // One-shot mode: `fridge-chef <image>` prints the parsed result and exits
    if let Some(path) = std::env::args().nth(1) {
        let result = scan_file(vision.as_ref(), &history, PathBuf::from(path)).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    log::info!("🚀 Starting FridgeChef...");

    let scan_handler = Arc::new(ScanHandler::new(vision, history.clone()));
    log::info!("✅ Scan handler initialized");

    #[cfg(feature = "http-server")]
    {
        if config.api_token.is_none() {
            log::warn!("⚠️ API_TOKEN not set, API is open to anyone who can reach it");
        }

        let state = AppState {
            scan_handler,
            history,
            api_token: config.api_token.clone(),
        };
        let app = create_router(state, config.static_dir.clone());

        let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
        log::info!("🌐 API server listening on {}", config.bind_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                tokio::signal::ctrl_c().await.ok();
                log::info!("🛑 Shutting down...");
            })
            .await?;
    }

    #[cfg(not(feature = "http-server"))]
    {
        let _ = (scan_handler, history);
        log::warn!("⚠️ Built without the http-server feature; pass an image path to scan it");
    }

    Ok(())
}

/// Scans one image with the stored dietary preferences. Nothing is written
/// to history.
async fn scan_file(
    vision: &dyn VisionService,
    history: &HistoryStore,
    path: PathBuf,
) -> Result<ScanResult> {
    let image = ImageInput::from_path(&path)?;
    let preferences = history.get_preferences().await?;
    let hint = dietary_hint(&preferences);
    log::info!(
        "📸 Scanning {} (dietary preferences: {})",
        path.display(),
        preferences.len()
    );

    let reply = vision.analyze(&image, hint.as_deref()).await?;
    let result = services::parse_response(&reply);

    if result.is_empty() {
        log::warn!("⚠️ No ingredients or recipes found in the reply");
    }

    Ok(result)
}
