pub mod error;
pub mod routes;

use std::{net::SocketAddr, sync::Arc};

use db::DBService;
use services::services::{
    config::AppConfig,
    customers::SqliteScopeFactory,
    mediator::{DispatchError, Dispatcher},
    notification::Notifier,
    pipeline::build_dispatcher,
};
use thiserror::Error;
use tokio::task::JoinHandle;

/// Error type for server startup
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),
}

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<Dispatcher>,
    db: DBService,
    default_page_size: u32,
}

impl AppState {
    /// Builds the request pipeline on top of `db`. Fails if the handler table
    /// is incomplete.
    pub fn new(
        config: &AppConfig,
        db: DBService,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, DispatchError> {
        let scopes = Arc::new(SqliteScopeFactory::new(db.clone()));
        let dispatcher = build_dispatcher(config, scopes, notifier)?;
        Ok(Self {
            dispatcher: Arc::new(dispatcher),
            db,
            default_page_size: config.default_page_size,
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn default_page_size(&self) -> u32 {
        self.default_page_size
    }
}

/// Starts the Axum HTTP server.
///
/// Binds to `bind_address` (port 0 picks a free port), spawns the server task
/// with graceful shutdown handling and returns the server URL together with
/// the task's `JoinHandle`.
pub async fn start_server(
    state: AppState,
    bind_address: &str,
) -> Result<(String, JoinHandle<()>), ServerError> {
    let app_router = routes::router(state);

    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let url = format!("http://{}", addr);

    tracing::info!("Server running on {}", url);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app_router)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((url, handle))
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM on Unix).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let terminate = async {
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
            } else {
                tracing::error!("Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
    }
}
