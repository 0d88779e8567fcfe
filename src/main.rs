use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};

use vidrelay::core::config::AppConfig;
use vidrelay::core::shutdown::{ShutdownCoordinator, SHUTDOWN_TIMEOUT_SECS};
use vidrelay::delivery::router::{self, AppState};
use vidrelay::observability::metrics as obs_metrics;
use vidrelay::storage::disk::DiskVideoSlot;

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration (defaults, then config/*.toml, then env vars)
    let config = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    info!(version = env!("CARGO_PKG_VERSION"), "vidrelay starting");

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "vidrelay exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let metrics_handle = if config.observability.metrics_enabled {
        match obs_metrics::install_prometheus_recorder() {
            Ok(handle) => {
                obs_metrics::describe_all_metrics();
                Some(handle)
            }
            Err(e) => {
                warn!(error = %e, "failed to install Prometheus recorder, metrics disabled");
                None
            }
        }
    } else {
        None
    };

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        obs_metrics::inc_panic_total();
        default_hook(info);
    }));

    // The upload directory is created once here, never per request.
    let slot = DiskVideoSlot::new(&config.storage.upload_dir, &config.storage.file_name)?;
    slot.init().await?;
    info!(path = %slot.path().display(), "latest slot ready");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address: {e}"))?;

    let app = router::build_router(AppState {
        slot: Arc::new(slot),
        config,
        metrics_handle,
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))?;
    info!(%addr, "server running");

    let shutdown = ShutdownCoordinator::new();
    let shutdown_token = shutdown.token();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
            .await
    });

    shutdown.wait_for_signal_and_shutdown().await;

    match tokio::time::timeout(
        std::time::Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
        server,
    )
    .await
    {
        Ok(Ok(Ok(()))) => {
            info!("graceful shutdown completed");
            Ok(())
        }
        Ok(Ok(Err(e))) => Err(anyhow::anyhow!("HTTP server error: {e}")),
        Ok(Err(e)) => Err(anyhow::anyhow!("HTTP server task failed: {e}")),
        Err(_) => Err(anyhow::anyhow!(
            "shutdown timed out after {SHUTDOWN_TIMEOUT_SECS}s"
        )),
    }
}

fn init_tracing(log_level: &str, log_format: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    match log_format {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
