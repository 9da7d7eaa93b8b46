use anyhow::{Context, Result};
use lectern_server::{
    NoopMediaRelay, RoomRegistry, SignalingConfig, SignalingService, StaticTokenAuthenticator,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = SignalingConfig::from_env().context("Failed to load configuration")?;
    info!("Starting lectern signaling server: {:?}", config);

    let authenticator =
        StaticTokenAuthenticator::parse(&config.tokens).context("Failed to parse LECTERN_TOKENS")?;
    if authenticator.is_empty() {
        warn!("No tokens configured; every connection will be rejected");
    }

    let registry = RoomRegistry::new(config.room.clone(), Arc::new(NoopMediaRelay));
    spawn_history_log(&registry);

    let service = SignalingService::new(
        registry,
        Arc::new(authenticator),
        config.connection.clone(),
    );

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!(
        "Signaling server listening on ws://{}/rooms/{{id}}/signal",
        listener.local_addr()?
    );

    axum::serve(listener, service.into_router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Signaling server stopped");
    Ok(())
}

/// Records every relayed broadcast at debug level.
fn spawn_history_log(registry: &RoomRegistry) {
    let mut events = registry.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!(
                    "[{}] {:?} in {:?}: {:?}",
                    event.at, event.peer_id, event.room_id, event.message.kind
                ),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("History log lagged, skipped {} events", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
