use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdfrelay_api::background::scratch_reaper;
use pdfrelay_api::config::ServerConfig;
use pdfrelay_api::router::build_app_router;
use pdfrelay_api::state::AppState;
use pdfrelay_events::{ProgressPublisher, RedisChannel};
use pdfrelay_worker::{JobRunner, ScratchSpace};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    // Loaded before tracing so DEBUG_MODE can pick the log level; a
    // configuration error is reported once tracing is up.
    let config = ServerConfig::from_env();
    let debug = config.as_ref().is_ok_and(|c| c.debug);

    // --- Tracing ---
    let level = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "pdfrelay_api={level},pdfrelay_worker={level},pdfrelay_events={level},tower_http={level}"
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config.inspect_err(|e| tracing::error!(error = %e, "Invalid configuration"))?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        debug = config.debug,
        channel = %config.redis_channel,
        "Loaded server configuration"
    );

    // --- Pub/sub ---
    let channel = RedisChannel::connect(&config.redis)
        .await
        .with_context(|| {
            format!(
                "Failed to connect to Redis at {}:{}",
                config.redis.host, config.redis.port
            )
        })?;

    let publisher = Arc::new(ProgressPublisher::new(
        Arc::new(channel),
        config.redis_channel.clone(),
    ));

    // --- Conversion engine ---
    let runner = Arc::new(JobRunner::new(
        config.engine.clone(),
        Duration::from_secs(config.job_timeout_secs),
    ));
    tracing::info!(
        program = %config.engine.program,
        base_args = ?config.engine.base_args,
        timeout_secs = config.job_timeout_secs,
        "Conversion engine configured"
    );

    // --- Scratch space ---
    let scratch = Arc::new(ScratchSpace::new(config.scratch_root.clone()));
    scratch.ensure_root().await.with_context(|| {
        format!(
            "Failed to create scratch root {}",
            config.scratch_root.display()
        )
    })?;

    // Spawn the scratch reaper (removes directories left by killed requests).
    let reaper_cancel = CancellationToken::new();
    let reaper_handle = tokio::spawn(scratch_reaper::run(
        Arc::clone(&scratch),
        Duration::from_secs(config.scratch_max_age_secs),
        Duration::from_secs(config.scratch_reap_interval_secs),
        reaper_cancel.clone(),
    ));

    // --- App state ---
    let host: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid HOST address {:?}", config.host))?;
    let addr = SocketAddr::new(host, config.port);

    let state = AppState {
        config: Arc::new(config),
        publisher: Arc::clone(&publisher),
        runner,
        scratch,
    };

    // --- Router ---
    let app = build_app_router(state);

    // --- Start server ---
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    reaper_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), reaper_handle).await;
    tracing::info!("Scratch reaper stopped");

    drop(publisher);
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
