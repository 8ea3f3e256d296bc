use std::sync::Arc;

use salvo::Listener;
use salvo::conn::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

use davgate_app::app::api::routes;
use davgate_app::engine::LocalFsFactory;
use davgate_core::config::load_config;
use davgate_service::gate::{Gate, GateConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting davgate WebDAV server");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let gate_config = GateConfig::from_settings(&config)?;

    tracing::info!(
        users = gate_config.registry.len(),
        auth = gate_config.auth_enabled,
        anonymous = gate_config.anonymous.is_some(),
        cors = gate_config.cors.enabled(),
        "Gate configured"
    );

    let factory = Arc::new(LocalFsFactory::new(config.server.max_upload_bytes));
    let gate = Arc::new(Gate::new(gate_config, factory));

    let bind_addr = config.server.bind_addr();
    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    tracing::info!("Server listening on {bind_addr}");

    salvo::Server::new(acceptor).serve(routes(gate)).await;

    Ok(())
}
