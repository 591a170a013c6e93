use std::sync::Arc;

use db::{
    DBService, Repository, SqliteRepository, SqliteUnitOfWork, UnitOfWork,
    models::customer::Customer,
};

/// Repository and unit of work sharing one batch of staged changes.
#[derive(Clone)]
pub struct CustomerScope {
    pub customers: Arc<dyn Repository<Customer>>,
    pub uow: Arc<dyn UnitOfWork>,
}

/// Opens a fresh [`CustomerScope`] for every handler or validator run.
pub trait ScopeFactory: Send + Sync {
    fn scope(&self) -> CustomerScope;
}

pub struct SqliteScopeFactory {
    db: DBService,
}

impl SqliteScopeFactory {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }
}

impl ScopeFactory for SqliteScopeFactory {
    fn scope(&self) -> CustomerScope {
        let uow = SqliteUnitOfWork::new(self.db.pool.clone());
        CustomerScope {
            customers: Arc::new(SqliteRepository::<Customer>::new(Arc::clone(&uow))),
            uow,
        }
    }
}
