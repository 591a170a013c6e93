use async_trait::async_trait;
use db::RepositoryError;
use thiserror::Error;

use super::Outcome;

/// Unexpected failure inside a handler or behavior. Expected business outcomes
/// are reported as [`Failure`](super::Failure) instead.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Handler failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One intended operation: a command that mutates state or a query that reads it.
pub trait Request: Send + Sync + 'static {
    type Response: Send + 'static;

    /// Short name used in logs. Defaults to the unqualified type name.
    fn name() -> &'static str
    where
        Self: Sized,
    {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// Executes exactly one request type.
#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync {
    async fn handle(&self, request: &R) -> Result<Outcome<R::Response>, HandlerError>;
}
