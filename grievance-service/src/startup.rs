//! Application startup and lifecycle management.

use axum::Router;
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::GrievanceConfig;
use crate::db::{create_pool, run_migrations};
use crate::services::{init_metrics, Database, InMemoryStore, JwtService, Repositories};
use crate::utils::password::Argon2Hasher;
use crate::{build_router, ApiSettings, AppState};

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    config: GrievanceConfig,
    state: AppState,
    shutdown: CancellationToken,
}

impl Application {
    /// Connect storage, run migrations and bind the listener.
    pub async fn build(config: GrievanceConfig) -> Result<Self, AppError> {
        init_metrics();

        let repos: Arc<dyn Repositories> = match &config.database.url {
            Some(url) => {
                let pool = create_pool(&config.database, url).await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                    AppError::from(e)
                })?;
                run_migrations(&pool).await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to run migrations");
                    AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e))
                })?;
                Arc::new(Database::new(pool))
            }
            None => {
                tracing::warn!("DATABASE_URL not set - using in-memory store, data is lost on restart");
                Arc::new(InMemoryStore::new())
            }
        };

        let state = AppState::new(
            repos,
            Arc::new(Argon2Hasher::default()),
            JwtService::new(&config.jwt),
            ApiSettings::from_config(&config),
        );

        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Grievance service listener bound");

        Ok(Self {
            port,
            listener,
            config,
            state,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Cancelling this token stops the server and the background jobs.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn spawn_background_jobs(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let dispatcher = self.state.dispatcher.clone();
        handles.push(tokio::spawn(dispatcher.run(
            Duration::from_secs(self.config.notifier.poll_interval_seconds),
            self.shutdown.clone(),
        )));

        if self.config.escalation.enabled {
            let sweep = self.state.escalation.clone();
            handles.push(tokio::spawn(sweep.run(
                Duration::from_secs(self.config.escalation.interval_seconds),
                self.shutdown.clone(),
            )));
        } else {
            tracing::info!("Escalation sweep disabled by configuration");
        }

        handles
    }

    /// Serve HTTP until the shutdown token is cancelled, then drain background jobs.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let jobs = self.spawn_background_jobs();
        let router: Router = build_router(self.state.clone());

        tracing::info!(
            service = %self.config.service_name,
            version = %self.config.service_version,
            port = self.port,
            "Service ready to accept connections"
        );

        let shutdown = self.shutdown.clone();
        let result = axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await;

        // The server may also stop on its own error; make sure the jobs follow.
        self.shutdown.cancel();
        for job in jobs {
            if let Err(e) = job.await {
                tracing::error!(error = %e, "Background job panicked");
            }
        }

        result.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
