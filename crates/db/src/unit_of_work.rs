use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::repository::RepositoryError;

/// Batches staged repository writes into one atomic commit.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Applies every staged change in a single transaction and returns how many
    /// were applied. On error nothing is persisted and the batch is dropped.
    async fn save(&self) -> Result<usize, RepositoryError>;

    /// Number of changes waiting for `save`.
    fn pending(&self) -> usize;

    /// Drops every staged change without touching the store.
    fn discard(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChangeKind {
    Insert,
    Update,
    SoftDelete,
}

pub(crate) struct PendingChange {
    pub kind: ChangeKind,
    pub entity: &'static str,
    pub id: Uuid,
    pub query: QueryBuilder<'static, Sqlite>,
}

/// SQLite-backed unit of work. One instance per request scope.
///
/// A change captures the entity's state at the moment it is staged.
pub struct SqliteUnitOfWork {
    pool: SqlitePool,
    pending: Mutex<Vec<PendingChange>>,
}

impl SqliteUnitOfWork {
    pub fn new(pool: SqlitePool) -> Arc<Self> {
        Arc::new(Self {
            pool,
            pending: Mutex::new(Vec::new()),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub(crate) fn stage(&self, change: PendingChange) {
        tracing::trace!(
            entity = change.entity,
            id = %change.id,
            kind = ?change.kind,
            "Staged change"
        );
        self.pending.lock().push(change);
    }
}

#[async_trait]
impl UnitOfWork for SqliteUnitOfWork {
    async fn save(&self) -> Result<usize, RepositoryError> {
        let changes = std::mem::take(&mut *self.pending.lock());
        if changes.is_empty() {
            return Ok(0);
        }

        let total = changes.len();
        let mut tx = self.pool.begin().await?;
        for mut change in changes {
            let result = change.query.build().execute(&mut *tx).await?;
            if change.kind != ChangeKind::Insert && result.rows_affected() == 0 {
                // Dropping `tx` rolls back everything applied so far.
                return Err(RepositoryError::Concurrency {
                    entity: change.entity,
                    id: change.id,
                });
            }
        }
        tx.commit().await?;

        tracing::debug!(changes = total, "Unit of work committed");
        Ok(total)
    }

    fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    fn discard(&self) {
        self.pending.lock().clear();
    }
}
