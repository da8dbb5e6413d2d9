mod config;

use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Context, Result, eyre};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

use wabridge_api::{AppState, build_router};
use wabridge_db::BridgeDb;
use wabridge_ipc::NetworkManager;
use wabridge_worker::{BridgeWorker, WorkerEvent};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let config = Config::parse();
    init_tracing(&config.log_level)?;

    let store_config = config.store_config();
    let db = BridgeDb::new(&store_config)
        .await
        .wrap_err_with(|| format!("Failed to open store at {}", store_config.db_path.display()))?;
    let db = Arc::new(db);

    let network = NetworkManager::new(config.network_config());
    let mut worker = BridgeWorker::new(db.clone(), network);

    let mut event_rx = worker
        .take_event_receiver()
        .ok_or_else(|| eyre!("Failed to get event receiver"))?;

    worker.start().await.wrap_err("Failed to start worker")?;

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            handle_event(event);
        }
    });

    let app = build_router(AppState::new(db.clone(), worker.network()));
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", addr))?;

    info!("REST API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Server error")?;

    info!("Shutting down...");
    worker.stop().await?;
    db.close().await;

    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    let mut filter = EnvFilter::builder().from_env_lossy();
    for krate in [
        "wabridge",
        "wabridge_api",
        "wabridge_worker",
        "wabridge_ipc",
        "wabridge_db",
    ] {
        let directive = format!("{krate}={level}")
            .parse::<Directive>()
            .wrap_err_with(|| format!("Invalid log level: {}", level))?;
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
    }
}

fn handle_event(event: WorkerEvent) {
    match event {
        WorkerEvent::ClientReady => info!("Network client is ready"),
        WorkerEvent::Connected { phone_number } => {
            info!("Connected (phone: {})", phone_number.unwrap_or_default())
        }
        WorkerEvent::Disconnected { reason } => info!("Disconnected: {}", reason),
        WorkerEvent::MessageStored {
            chat_jid,
            message_id,
            timestamp,
        } => {
            tracing::debug!(%chat_jid, %message_id, timestamp, "Stored message")
        }
        WorkerEvent::MessageSkipped {
            chat_jid,
            message_id,
        } => {
            tracing::debug!(%chat_jid, %message_id, "Skipped empty message")
        }
        WorkerEvent::Error { error } => tracing::error!("Worker error: {}", error),
    }
}
