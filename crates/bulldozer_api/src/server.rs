//! Webhook service lifecycle
//!
//! [`ApiServer`] binds the listener, starts the optional startup sweep next to the
//! webhook routes, and on shutdown reports the work it leaves behind. Notifications
//! still queued or running when the process stops are not drained; the next startup
//! sweep picks their pull requests up again.

use anyhow::Context;
use axum::Router;
use bulldozer_core::FullScanReconciler;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{routes, AppState, DEFAULT_PORT};

/// Address the webhook service listens on.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub port: u16,
    pub host: String,
}

impl ApiConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("Invalid listen address '{}'", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: "0.0.0.0".to_string(),
        }
    }
}

pub struct ApiServer {
    config: ApiConfig,
    state: AppState,
    startup_scan: Option<FullScanReconciler>,
}

impl ApiServer {
    pub fn new(config: ApiConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            startup_scan: None,
        }
    }

    /// Runs `scanner` once in the background as soon as the server is listening.
    pub fn with_startup_scan(mut self, scanner: FullScanReconciler) -> Self {
        self.startup_scan = Some(scanner);
        self
    }

    pub fn router(&self) -> Router {
        routes::create_router(self.state.clone())
    }

    /// Serves webhooks on the configured address until CTRL+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Fails when the address is invalid, cannot be bound, or the server stops
    /// with an I/O error.
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!(%addr, "Listening for webhook deliveries");

        self.serve_until(listener, shutdown_signal()).await
    }

    /// Serves webhooks on `listener` until `shutdown` resolves.
    pub async fn serve_until<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let events = self.state.events.clone();
        let scan = self.startup_scan.map(spawn_startup_scan);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("Webhook server stopped unexpectedly")?;

        if let Some(scan) = scan {
            if !scan.is_finished() {
                warn!("Abandoning the unfinished startup scan");
                scan.abort();
            }
        }

        let pending = events.pending();
        if pending > 0 {
            warn!(pending, "Abandoning notifications that are still queued or running");
        }

        info!("Webhook server stopped");
        Ok(())
    }
}

fn spawn_startup_scan(scanner: FullScanReconciler) -> JoinHandle<()> {
    tokio::spawn(async move {
        match scanner.run().await {
            Ok(report) => info!(
                pull_requests = report.pull_requests,
                failures = report.failures,
                "Startup scan complete"
            ),
            Err(e) => error!(error = %e, "Startup scan failed"),
        }
    })
}

/// Resolves on CTRL+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
        info!("Received CTRL+C, shutting down");
    };

    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate.recv() => info!("Received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await;
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
