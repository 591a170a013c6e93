use std::{str::FromStr, time::Duration};

use sqlx::{
    Error, Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
};

pub mod entity;
pub mod models;
pub mod repository;
pub mod unit_of_work;

pub use entity::{Auditable, Entity, Identified, SoftDeletable, Versioned};
pub use repository::{Page, PageRequest, Repository, RepositoryError, SqliteRepository};
pub use unit_of_work::{SqliteUnitOfWork, UnitOfWork};

#[derive(Clone)]
pub struct DBService {
    pub pool: Pool<Sqlite>,
}

impl DBService {
    fn pool_options() -> SqlitePoolOptions {
        SqlitePoolOptions::new()
            .max_connections(20)
            .min_connections(1)
            .idle_timeout(Duration::from_secs(300))
            .acquire_timeout(Duration::from_secs(30))
    }

    fn connect_options(database_url: &str) -> Result<SqliteConnectOptions, Error> {
        Ok(SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30))
            .synchronous(SqliteSynchronous::Normal))
    }

    /// Opens (creating if missing) the database at `database_url` and applies migrations.
    pub async fn new(database_url: &str) -> Result<DBService, RepositoryError> {
        let pool = Self::pool_options()
            .connect_with(Self::connect_options(database_url)?)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        sqlx::query("PRAGMA optimize").execute(&pool).await?;
        tracing::debug!(database_url, "Database ready");
        Ok(DBService { pool })
    }

    /// Liveness check against the pool.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
