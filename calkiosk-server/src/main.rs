use anyhow::{Context, Result};
use calkiosk_core::Store;

use calkiosk_server::config::Config;
use calkiosk_server::state::AppState;
use calkiosk_server::{app, logging, scheduler, singleton};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = Config::from_env()?;

    // Ensure only one instance is running against this database
    let _lock = singleton::acquire_lock(&config.database_path)?;

    let store = Store::open(&config.database_path).with_context(|| {
        format!(
            "Failed to open database at {}",
            config.database_path.display()
        )
    })?;

    let addr = config.addr();
    let sync_interval = config.sync_interval;
    let state = AppState::new(config, store);
    let sync_task = scheduler::spawn(state.sync.clone(), sync_interval);

    let app = app(state)?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("calkiosk-server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sync_task.abort();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
