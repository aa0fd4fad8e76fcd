//! Grievance Service entry point.

use grievance_service::config::GrievanceConfig;
use grievance_service::startup::Application;
use service_core::observability::{init_tracing, shutdown_tracing};
use tokio::signal;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = GrievanceConfig::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    // Mask secrets: only their presence is logged.
    tracing::info!(
        service_name = %config.service_name,
        environment = ?config.environment,
        port = config.common.port,
        database = if config.database.url.is_some() { "postgres" } else { "in-memory" },
        escalation_enabled = config.escalation.enabled,
        escalation_interval_secs = config.escalation.interval_seconds,
        escalation_threshold_days = config.escalation.threshold_days,
        notifier_poll_secs = config.notifier.poll_interval_seconds,
        otlp_enabled = config.otlp_endpoint.is_some(),
        "Configuration loaded"
    );

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to build application");
        std::io::Error::other(format!("Application build error: {}", e))
    })?;

    let shutdown = app.shutdown_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.cancel();
    });

    let result = app.run_until_stopped().await;

    tracing::info!("Service shutdown complete");
    shutdown_tracing();
    result
}
