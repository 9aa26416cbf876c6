//! crudl-server: mounts the configured models and serves them over HTTP.

use crudl::{
    ensure_database_exists, AppState, Catalog, InMemorySessionProvider, PgSessionProvider, Settings,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crudl=info,tower_http=info")),
        )
        .init();

    if let Some(path) = &settings.env_file {
        tracing::debug!(path = %path.display(), "loaded env file");
    }
    tracing::info!("Starting up...");
    tracing::info!("Models:");
    let registry = match &settings.models {
        Some(names) => Catalog::select(names.as_slice())?,
        None => Catalog::all()?,
    }
    .with_body_limit(settings.max_body_bytes);

    let state = if settings.uses_memory_store() {
        tracing::warn!("using the in-memory store; records are lost on exit");
        let sessions = InMemorySessionProvider::new();
        registry.ensure_tables(&sessions).await?;
        AppState::new(sessions)
    } else {
        ensure_database_exists(&settings.database_url).await?;
        let sessions = PgSessionProvider::connect(&settings.database_url, settings.max_connections).await?;
        registry.ensure_tables(&sessions).await?;
        AppState::new(sessions)
    };

    let app = registry.router(state);
    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
