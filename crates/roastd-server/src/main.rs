mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use roastd_api::{AppStateInner, router};
use roastd_core::{InboxStore, Orchestrator, SessionRegistry};
use roastd_db::Database;
use roastd_imagegen::{GeminiClient, GeminiConfig, ImageGenerator, UnconfiguredGenerator};
use roastd_storage::DiskStore;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "roastd=debug,roastd_core=debug,roastd_api=debug,roastd_db=debug,roastd_storage=debug,roastd_imagegen=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = ServerConfig::from_env()?;

    // Init database and object storage
    let db = Arc::new(Database::open(&config.db_path)?);
    let storage = Arc::new(
        DiskStore::new(
            config.storage_dir.clone(),
            &config.public_url,
            config.fetch_timeout,
            config.max_upload_bytes,
        )
        .await?,
    );

    let generator: Arc<dyn ImageGenerator> = match &config.gemini_api_key {
        Some(key) => Arc::new(GeminiClient::new(GeminiConfig::new(
            key.clone(),
            config.gemini_model.clone(),
            config.generation_timeout,
        ))?),
        None => {
            warn!("GEMINI_API_KEY is not set; every generation will return the original photo");
            Arc::new(UnconfiguredGenerator)
        }
    };

    // A run past its lease has been cut short; let clients edit prompts again.
    let registry = SessionRegistry::new(db.clone())
        .with_generation_lease(config.generation_timeout * 3 + config.fetch_timeout * 2);
    let inbox = InboxStore::new(db);
    let orchestrator = Arc::new(Orchestrator::new(
        registry.clone(),
        inbox.clone(),
        storage.clone(),
        generator,
        config.generation_timeout,
    ));

    let app = router(Arc::new(AppStateInner {
        registry,
        inbox,
        orchestrator,
        storage,
        max_upload_bytes: config.max_upload_bytes,
    }));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("roastd listening on {} (public URL {})", addr, config.public_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
