use anyhow::Context;
use std::sync::Arc;

use chord_dfs::config::Settings;
use chord_dfs::service::handlers;
use chord_dfs::service::node_service::NodeService;
use chord_dfs::storage::local::LocalStorageBackend;
use chord_dfs::transport::http::HttpTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        // .with_max_level(tracing::Level::DEBUG)
        .with_max_level(tracing::Level::INFO)
        .init();

    let settings = Settings::from_env()?;
    let address = settings.address();

    tracing::info!("Starting node on {}", address);
    match settings.bootstrap_address() {
        Some(bootstrap) => tracing::info!("Joining ring via {}", bootstrap),
        None => tracing::info!("Starting as bootstrap node (founder)"),
    }

    let storage = LocalStorageBackend::new(&settings.storage_path, settings.m_bits);
    storage
        .initialize()
        .await
        .context("failed to prepare storage directory")?;

    let transport = HttpTransport::new(settings.rpc_timeout);

    let service = Arc::new(NodeService::new(
        address,
        settings.bootstrap_address(),
        settings.m_bits,
        settings.stabilize_period,
        Arc::new(transport),
        Arc::new(storage),
    ));
    tracing::info!(
        "Node id: {} (ring size {})",
        service.id(),
        service.ring_size()
    );

    let bind_addr = format!("0.0.0.0:{}", settings.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    // Joins the ring (retrying until the bootstrap answers) and spawns the
    // stabilization task.
    let stabilizer = service.start().await?;

    let app = handlers::router(service.clone(), settings.max_body_bytes);

    tracing::info!("HTTP server listening on {}", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    stabilizer.abort();
    tracing::info!("Node {} stopped", service.id());

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
