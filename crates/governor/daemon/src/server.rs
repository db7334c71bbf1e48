//! Server setup and lifecycle management

use std::sync::Arc;

use governor_core::{PrivilegedChannel, SafetyGovernor};
use tokio::net::TcpListener;

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use crate::scheduler::Sweeper;

/// Safety governor daemon server
pub struct Server {
    config: DaemonConfig,
    governor: SafetyGovernor,
    privileged: PrivilegedChannel,
    sweeper: Arc<Sweeper>,
}

impl Server {
    /// Create a new server with the given configuration
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        if config.scheduler.tick_interval_ms == 0 {
            return Err(DaemonError::Config(
                "scheduler.tick_interval_ms must be positive".to_string(),
            ));
        }

        let (governor, privileged) = SafetyGovernor::new(config.governor.clone());
        let sweeper = Sweeper::new(config.scheduler.clone(), governor.clone());

        Ok(Self {
            config,
            governor,
            privileged,
            sweeper,
        })
    }

    /// Governor handle, for embedding callers
    pub fn governor(&self) -> &SafetyGovernor {
        &self.governor
    }

    /// Run the server
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        if self.config.admin.token.is_none() {
            tracing::warn!("No admin token configured; privileged API is disabled");
        }

        // Create app state
        let state = AppState::new(
            self.governor.clone(),
            self.privileged.clone(),
            self.config.admin.token.clone(),
        );

        // Create router
        let app = create_router(state);

        // Create listener
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Safety governor listening on {}", addr);

        // Start sweeper in background
        let sweeper = self.sweeper.clone();
        let sweeper_handle = tokio::spawn(async move {
            sweeper.start().await;
        });

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Safety governor shutting down");

        // Stop sweeper, then refuse everything still in flight
        self.sweeper.stop().await;
        self.governor.shutdown();
        if let Err(e) = sweeper_handle.await {
            tracing::error!(error = %e, "Sweeper task failed");
        }

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
