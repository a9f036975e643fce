//! Agent startup and the HTTP listener

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::api;
use crate::config::AgentConfig;
use crate::directory::{HttpDirectory, OfflineDirectory, PrinterDirectory};
use crate::driver::EscPosDriver;
use crate::service::PrintService;

/// Build the service, bring the catalog up, then serve until a shutdown signal
pub async fn run(config: AgentConfig) -> anyhow::Result<()> {
    let catalog = config.load_catalog()?;
    let driver = Arc::new(EscPosDriver::new(config.attempt_timeout()));
    let service = Arc::new(PrintService::from_config(&config, catalog, driver)?);

    let directory: Box<dyn PrinterDirectory> = match &config.api_base {
        Some(base) => Box::new(HttpDirectory::new(base, config.directory_timeout())?),
        None => {
            tracing::info!("Printer directory disabled, using local catalog");
            Box::new(OfflineDirectory)
        }
    };
    service.initialize(directory.as_ref()).await;

    // Local only: the dashboard and the POS run on this machine
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, config.http_port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = %config.environment, "Print agent listening");

    axum::serve(listener, api::build_app(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Print agent stopped");
    Ok(())
}

/// Ctrl+C or SIGTERM
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
