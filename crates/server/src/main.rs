use std::sync::Arc;

use anyhow::Error as AnyhowError;
use db::{DBService, RepositoryError};
use server::{AppState, ServerError, start_server};
use services::services::{
    config::{AppConfig, ConfigError},
    mediator::DispatchError,
    notification::LogNotifier,
};
use thiserror::Error;
use utils::logging::{self, LoggingError};

#[derive(Debug, Error)]
pub enum CustomersServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error(transparent)]
    Database(#[from] RepositoryError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

#[tokio::main]
async fn main() -> Result<(), CustomersServerError> {
    let config = AppConfig::load().await?;
    logging::init(config.log_format, &config.log_level)?;
    tracing::debug!(?config, "Configuration loaded");

    let db = DBService::new(&config.database_url).await?;
    let state = AppState::new(&config, db.clone(), Arc::new(LogNotifier))?;

    let (_url, handle) = start_server(state, &config.bind_address()).await?;
    handle
        .await
        .map_err(|e| anyhow::anyhow!("Server task failed: {}", e))?;

    db.pool.close().await;
    tracing::info!("Server stopped");
    Ok(())
}
