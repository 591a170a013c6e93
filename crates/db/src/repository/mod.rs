//! Storage-agnostic CRUD surface over one entity type.
//!
//! Reads go straight to the store and never return soft-deleted rows.
//! Writes (`add`, `update`, `remove`) are only staged; they reach the store
//! when the owning [`UnitOfWork`](crate::UnitOfWork) is saved.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::entity::Entity;

mod sqlite;

pub use sqlite::{SqlEntity, SqlFilter, SqliteRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Unique constraint violated: {0}")]
    Conflict(String),
    #[error("{entity} {id} is missing or was modified concurrently")]
    Concurrency { entity: &'static str, id: Uuid },
    #[error("Invalid page request: {0}")]
    InvalidPage(String),
    #[error(transparent)]
    Database(sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepositoryError::Conflict(db_err.message().to_string())
            }
            other => RepositoryError::Database(other),
        }
    }
}

/// A validated page selector. Page numbers start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page_number: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page_number: u32, page_size: u32) -> Result<Self, RepositoryError> {
        if page_number < 1 {
            return Err(RepositoryError::InvalidPage(
                "page number must be at least 1".to_string(),
            ));
        }
        if page_size < 1 {
            return Err(RepositoryError::InvalidPage(
                "page size must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            page_number,
            page_size,
        })
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page_number - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page_number: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: i64, request: PageRequest) -> Self {
        Self {
            items,
            total_count,
            page_number: request.page_number(),
            page_size: request.page_size(),
        }
    }

    pub fn total_pages(&self) -> i64 {
        if self.page_size == 0 {
            return 0;
        }
        let size = i64::from(self.page_size);
        (self.total_count + size - 1) / size
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page_number: self.page_number,
            page_size: self.page_size,
        }
    }
}

#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Returns `None` when the row is absent or soft-deleted.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<E>, RepositoryError>;

    async fn get_all(&self) -> Result<Vec<E>, RepositoryError>;

    async fn get_paged(
        &self,
        page: PageRequest,
        filter: &E::Filter,
    ) -> Result<Page<E>, RepositoryError>;

    async fn find(&self, filter: &E::Filter) -> Result<Vec<E>, RepositoryError>;

    async fn exists(&self, id: Uuid) -> Result<bool, RepositoryError>;

    async fn count(&self, filter: &E::Filter) -> Result<i64, RepositoryError>;

    /// Stages an insert.
    fn add(&self, entity: &E);

    /// Stages an update guarded by the entity's current version.
    fn update(&self, entity: &E);

    /// Stages a logical delete. Rows are never physically erased.
    fn remove(&self, entity: &E);
}
