mod config;
mod shutdown;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mud::{run_session, LairKeeper, PlayerStore, SqliteStore, WorldContent, WorldContext};
use net::{ServerChannels, SessionLink};

use crate::config::{parse_cli_args, ServerConfig};
use crate::shutdown::{shutdown_channel, ShutdownRx};

/// How long sessions get to save after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    observability::init_logging();

    let config = parse_cli_args();
    tracing::info!("Depths server starting...");

    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    let (output_tx, output_rx) = tokio::sync::mpsc::unbounded_channel();
    let (register_tx, register_rx) = tokio::sync::mpsc::unbounded_channel();
    let (unregister_tx, unregister_rx) = tokio::sync::mpsc::unbounded_channel();

    let ctx = match build_world(&config, output_tx.clone()) {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            tracing::error!("Failed to start: {}", e);
            std::process::exit(1);
        }
    };

    tokio::spawn(net::output_router::run_output_router(
        output_rx,
        register_rx,
        unregister_rx,
    ));

    tokio::spawn(LairKeeper::new().run(
        Arc::clone(&ctx),
        config.lair_interval(),
        shutdown_rx.clone().into_inner(),
    ));

    let channels = ServerChannels {
        output_tx,
        register_tx,
        unregister_tx,
    };
    let server_future = run_server(&config, Arc::clone(&ctx), channels, shutdown_rx);

    tokio::select! {
        _ = shutdown::wait_for_signal() => {
            tracing::info!("Shutdown signal received, stopping server...");
            shutdown_tx.trigger();
            drain_sessions(&ctx).await;
        }
        _ = server_future => {}
    }

    tracing::info!("Server stopped.");
}

fn build_world(
    config: &ServerConfig,
    output_tx: net::OutputTx,
) -> Result<WorldContext, Box<dyn std::error::Error>> {
    let content = WorldContent::load_dir(Path::new(&config.world.content_dir))?;
    let store: Arc<dyn PlayerStore> = Arc::new(SqliteStore::open(&config.database.path)?);
    tracing::info!(path = %config.database.path, "Player database opened");

    let ctx = WorldContext::new(content, store, output_tx, config.to_game_settings())?;
    Ok(ctx)
}

async fn run_server(
    config: &ServerConfig,
    ctx: Arc<WorldContext>,
    channels: ServerChannels,
    shutdown_rx: ShutdownRx,
) {
    let stopping = shutdown_rx.clone();
    let session_shutdown = shutdown_rx.clone().into_inner();
    let on_session = move |link: SessionLink| {
        let ctx = Arc::clone(&ctx);
        let shutdown = session_shutdown.clone();
        async move {
            run_session(ctx, link, shutdown).await;
        }
    };

    if let Err(e) = net::server::run_tcp_server(
        config.net.telnet_addr.clone(),
        config.to_rate_limits(),
        channels,
        shutdown_rx.into_inner(),
        on_session,
    )
    .await
    {
        tracing::error!("TCP server error: {}", e);
    }
    if !stopping.is_shutdown() {
        tracing::warn!("listener exited before shutdown was requested");
    }
}

/// Give session tasks a bounded window to save and leave.
async fn drain_sessions(ctx: &WorldContext) {
    let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;
    while ctx.sessions.active_count() > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let remaining = ctx.sessions.active_count();
    if remaining > 0 {
        tracing::warn!(remaining, "sessions still open at shutdown");
    }
}
