//! Top-level application wiring: models, storage, messaging are configured
//! before `run`; after the listener binds, the registry is read-only.

use crate::config::AppConfig;
use crate::dispatch::Dispatcher;
use crate::error::AppError;
use crate::model::Model;
use crate::queue::Messaging;
use crate::registry::ModelRegistry;
use crate::routes::{api_routes, common_routes, cors_layer};
use crate::state::AppState;
use crate::storage::Storage;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

pub struct App {
    config: AppConfig,
    registry: ModelRegistry,
    storage: Option<Arc<dyn Storage>>,
    messaging: Option<Messaging>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        App {
            config,
            registry: ModelRegistry::new(),
            storage: None,
            messaging: None,
        }
    }

    pub fn register_model(mut self, model: Model) -> Self {
        self.registry.register(model);
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_messaging(mut self, messaging: Messaging) -> Self {
        self.messaging = Some(messaging);
        self
    }

    /// Migrate storage, start serving, and run until a shutdown signal.
    /// Messaging workers are spawned alongside the server and torn down
    /// cooperatively once it drains.
    pub async fn run(self) -> Result<(), AppError> {
        let App {
            config,
            registry,
            storage,
            messaging,
        } = self;

        let storage =
            storage.ok_or_else(|| AppError::Internal("no storage backend configured".into()))?;
        storage.migrate().await.map_err(|e| e.wrap("storage migrate"))?;

        let state = AppState {
            dispatcher: Arc::new(Dispatcher::new(Arc::new(registry), storage)),
        };
        let app = Router::new()
            .merge(common_routes())
            .nest("/api", api_routes(state))
            .layer(cors_layer(&config.cors));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let workers = match &messaging {
            Some(m) if !m.is_empty() => m.spawn(shutdown_rx),
            _ => Vec::new(),
        };

        let listener = TcpListener::bind(&config.http.addr)
            .await
            .map_err(|e| AppError::internal("bind listener", e))?;
        tracing::info!(addr = %config.http.addr, "listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| AppError::internal("serve", e))?;

        let _ = shutdown_tx.send(true);
        for worker in workers {
            let _ = worker.await;
        }
        if let Some(m) = &messaging {
            m.broker().disconnect().await;
        }
        tracing::info!("shutdown complete");
        Ok(())
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("models", &self.registry.len())
            .field("has_storage", &self.storage.is_some())
            .field("has_messaging", &self.messaging.is_some())
            .finish()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "install shutdown signal handler");
    }
    tracing::info!("shutdown signal received");
}
