//! Customer requests, their handlers and input validators.

use std::sync::Arc;

use db::{RepositoryError, models::customer::DomainError};

use super::{
    mediator::{DispatcherBuilder, Failure, FailureKind, HandlerError},
    notification::Notifier,
    validation::ValidatorRegistry,
};

mod commands;
mod dto;
mod queries;
mod scope;
mod validators;

pub use commands::{
    CreateCustomer, CreateCustomerHandler, DeleteCustomer, DeleteCustomerHandler,
    PromoteCustomerToVip, PromoteCustomerToVipHandler, UpdateCustomer, UpdateCustomerHandler,
};
pub use dto::CustomerDto;
pub use queries::{GetCustomerById, GetCustomerByIdHandler, ListCustomers, ListCustomersHandler};
pub use scope::{CustomerScope, ScopeFactory, SqliteScopeFactory};
pub use validators::{
    CreateCustomerValidator, ListCustomersValidator, UpdateCustomerValidator,
};

/// Entity label used in not-found messages.
pub const CUSTOMER: &str = "Customer";

impl From<DomainError> for Failure {
    fn from(err: DomainError) -> Self {
        let message = err.to_string();
        match err.field() {
            Some(_) => Failure::validation(message.clone(), vec![message]),
            None => Failure::new(FailureKind::DomainRule, message),
        }
    }
}

/// Turns a failed `save` into a [`Failure`] when the caller can act on it.
/// Anything else is infrastructure and stays an error.
pub(crate) fn save_failure(err: RepositoryError) -> Result<Failure, HandlerError> {
    match err {
        RepositoryError::Conflict(detail) => {
            tracing::debug!(%detail, "Unique constraint rejected save");
            Ok(Failure::conflict("A customer with this email already exists"))
        }
        RepositoryError::Concurrency { .. } => Ok(Failure::conflict(
            "Customer was modified concurrently, reload and retry",
        )),
        other => Err(other.into()),
    }
}

/// Adds every customer handler to `builder` and declares each request as
/// expected, so a missing registration fails at startup.
pub fn register_handlers(
    builder: DispatcherBuilder,
    scopes: Arc<dyn ScopeFactory>,
    notifier: Arc<dyn Notifier>,
) -> DispatcherBuilder {
    let create_scopes = Arc::clone(&scopes);
    let update_scopes = Arc::clone(&scopes);
    let promote_scopes = Arc::clone(&scopes);
    let delete_scopes = Arc::clone(&scopes);
    let get_scopes = Arc::clone(&scopes);
    let list_scopes = scopes;

    builder
        .with_handler::<CreateCustomer, _, _>(move || {
            CreateCustomerHandler::new(create_scopes.scope(), Arc::clone(&notifier))
        })
        .with_handler::<UpdateCustomer, _, _>(move || {
            UpdateCustomerHandler::new(update_scopes.scope())
        })
        .with_handler::<PromoteCustomerToVip, _, _>(move || {
            PromoteCustomerToVipHandler::new(promote_scopes.scope())
        })
        .with_handler::<DeleteCustomer, _, _>(move || {
            DeleteCustomerHandler::new(delete_scopes.scope())
        })
        .with_handler::<GetCustomerById, _, _>(move || {
            GetCustomerByIdHandler::new(get_scopes.scope())
        })
        .with_handler::<ListCustomers, _, _>(move || ListCustomersHandler::new(list_scopes.scope()))
        .expect::<CreateCustomer>()
        .expect::<UpdateCustomer>()
        .expect::<PromoteCustomerToVip>()
        .expect::<DeleteCustomer>()
        .expect::<GetCustomerById>()
        .expect::<ListCustomers>()
}

/// Registers the input validators for customer requests.
pub fn register_validators(
    registry: &mut ValidatorRegistry,
    scopes: Arc<dyn ScopeFactory>,
    max_page_size: u32,
) {
    registry.register::<CreateCustomer, _>(CreateCustomerValidator::new(Arc::clone(&scopes)));
    registry.register::<UpdateCustomer, _>(UpdateCustomerValidator::new(scopes));
    registry.register::<ListCustomers, _>(ListCustomersValidator::new(max_page_size));
}
