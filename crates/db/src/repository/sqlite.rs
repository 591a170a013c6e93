use std::{marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::{Page, PageRequest, Repository, RepositoryError};
use crate::{
    entity::Entity,
    unit_of_work::{ChangeKind, PendingChange, SqliteUnitOfWork},
};

/// Table mapping for an entity stored in SQLite.
///
/// Tables must carry `id`, `is_deleted`, `version` and `updated_at` columns.
pub trait SqlEntity: Entity + Unpin + for<'r> FromRow<'r, SqliteRow> {
    const TABLE: &'static str;
    /// Select list matching the `FromRow` implementation.
    const COLUMNS: &'static str;
    /// Stable sort key used by `find` and `get_paged`.
    const ORDER_BY: &'static str;

    /// Complete `INSERT` statement for this entity.
    fn insert_query(&self) -> QueryBuilder<'static, Sqlite>;

    /// Pushes `col = ?, col = ?` assignments for an update. The repository adds
    /// the version bump and the `WHERE` clause.
    fn push_update_assignments(&self, qb: &mut QueryBuilder<'static, Sqlite>);
}

/// Predicate that narrows a `WHERE is_deleted = 0` query.
pub trait SqlFilter {
    /// Appends zero or more ` AND ...` conditions.
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Sqlite>);
}

pub struct SqliteRepository<E> {
    pool: SqlitePool,
    uow: Arc<SqliteUnitOfWork>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: SqlEntity> SqliteRepository<E> {
    /// Repository whose writes are staged in `uow`.
    pub fn new(uow: Arc<SqliteUnitOfWork>) -> Self {
        Self {
            pool: uow.pool().clone(),
            uow,
            _entity: PhantomData,
        }
    }

    fn select(projection: &str) -> QueryBuilder<'static, Sqlite> {
        QueryBuilder::new(format!(
            "SELECT {projection} FROM {} WHERE is_deleted = 0",
            E::TABLE
        ))
    }

    fn filtered(projection: &str, filter: &E::Filter) -> QueryBuilder<'static, Sqlite>
    where
        E::Filter: SqlFilter,
    {
        let mut qb = Self::select(projection);
        filter.push_conditions(&mut qb);
        qb
    }
}

#[async_trait]
impl<E> Repository<E> for SqliteRepository<E>
where
    E: SqlEntity,
    E::Filter: SqlFilter,
{
    async fn get_by_id(&self, id: Uuid) -> Result<Option<E>, RepositoryError> {
        let mut qb = Self::select(E::COLUMNS);
        qb.push(" AND id = ").push_bind(id);
        Ok(qb.build_query_as::<E>().fetch_optional(&self.pool).await?)
    }

    async fn get_all(&self) -> Result<Vec<E>, RepositoryError> {
        let mut qb = Self::select(E::COLUMNS);
        qb.push(" ORDER BY ").push(E::ORDER_BY);
        Ok(qb.build_query_as::<E>().fetch_all(&self.pool).await?)
    }

    async fn get_paged(
        &self,
        page: PageRequest,
        filter: &E::Filter,
    ) -> Result<Page<E>, RepositoryError> {
        // Count and page read one snapshot so the total matches the items.
        let mut tx = self.pool.begin().await?;

        let mut count_qb = Self::filtered("COUNT(*)", filter);
        let total_count: i64 = count_qb.build_query_scalar().fetch_one(&mut *tx).await?;

        let mut qb = Self::filtered(E::COLUMNS, filter);
        qb.push(" ORDER BY ")
            .push(E::ORDER_BY)
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = qb.build_query_as::<E>().fetch_all(&mut *tx).await?;

        tx.commit().await?;
        Ok(Page::new(items, total_count, page))
    }

    async fn find(&self, filter: &E::Filter) -> Result<Vec<E>, RepositoryError> {
        let mut qb = Self::filtered(E::COLUMNS, filter);
        qb.push(" ORDER BY ").push(E::ORDER_BY);
        Ok(qb.build_query_as::<E>().fetch_all(&self.pool).await?)
    }

    async fn exists(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut qb = Self::select("COUNT(*)");
        qb.push(" AND id = ").push_bind(id);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count > 0)
    }

    async fn count(&self, filter: &E::Filter) -> Result<i64, RepositoryError> {
        let mut qb = Self::filtered("COUNT(*)", filter);
        Ok(qb.build_query_scalar().fetch_one(&self.pool).await?)
    }

    fn add(&self, entity: &E) {
        self.uow.stage(PendingChange {
            kind: ChangeKind::Insert,
            entity: E::NAME,
            id: entity.id(),
            query: entity.insert_query(),
        });
    }

    fn update(&self, entity: &E) {
        let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", E::TABLE));
        entity.push_update_assignments(&mut qb);
        qb.push(", version = version + 1 WHERE id = ")
            .push_bind(entity.id())
            .push(" AND version = ")
            .push_bind(entity.version())
            .push(" AND is_deleted = 0");

        self.uow.stage(PendingChange {
            kind: ChangeKind::Update,
            entity: E::NAME,
            id: entity.id(),
            query: qb,
        });
    }

    fn remove(&self, entity: &E) {
        let mut qb = QueryBuilder::new(format!(
            "UPDATE {} SET is_deleted = 1, version = version + 1, updated_at = ",
            E::TABLE
        ));
        qb.push_bind(Utc::now())
            .push(" WHERE id = ")
            .push_bind(entity.id())
            .push(" AND version = ")
            .push_bind(entity.version())
            .push(" AND is_deleted = 0");

        self.uow.stage(PendingChange {
            kind: ChangeKind::SoftDelete,
            entity: E::NAME,
            id: entity.id(),
            query: qb,
        });
    }
}
