use std::sync::Arc;

use async_trait::async_trait;
use db::{Identified, Repository, UnitOfWork, models::customer::Customer};
use serde::Deserialize;
use uuid::Uuid;

use super::{CUSTOMER, CustomerDto, CustomerScope, save_failure};
use crate::services::{
    mediator::{Failure, HandlerError, Outcome, Request, RequestHandler},
    notification::{Notification, Notifier, spawn_notification},
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomer {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Request for CreateCustomer {
    type Response = CustomerDto;
}

/// Replaces name, email and phone of an existing customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCustomer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl Request for UpdateCustomer {
    type Response = CustomerDto;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromoteCustomerToVip {
    pub id: Uuid,
}

impl Request for PromoteCustomerToVip {
    type Response = CustomerDto;
}

/// Logical delete. The row is kept but never returned again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteCustomer {
    pub id: Uuid,
}

impl Request for DeleteCustomer {
    type Response = ();
}

/// Loads a live customer or reports it as not found.
async fn load(
    customers: &dyn Repository<Customer>,
    id: Uuid,
) -> Result<Result<Customer, Failure>, HandlerError> {
    Ok(customers
        .get_by_id(id)
        .await?
        .ok_or_else(|| Failure::not_found(CUSTOMER, id)))
}

pub struct CreateCustomerHandler {
    customers: Arc<dyn Repository<Customer>>,
    uow: Arc<dyn UnitOfWork>,
    notifier: Arc<dyn Notifier>,
}

impl CreateCustomerHandler {
    pub fn new(scope: CustomerScope, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            customers: scope.customers,
            uow: scope.uow,
            notifier,
        }
    }
}

#[async_trait]
impl RequestHandler<CreateCustomer> for CreateCustomerHandler {
    async fn handle(&self, request: &CreateCustomer) -> Result<Outcome<CustomerDto>, HandlerError> {
        let customer = match Customer::new(&request.name, &request.email, request.phone.as_deref())
        {
            Ok(customer) => customer,
            Err(e) => return Ok(Failure::from(e).into()),
        };

        self.customers.add(&customer);
        if let Err(e) = self.uow.save().await {
            return Ok(save_failure(e)?.into());
        }
        tracing::info!(customer_id = %customer.id(), "Customer created");

        spawn_notification(
            Arc::clone(&self.notifier),
            Notification::welcome(customer.id(), customer.name(), customer.email()),
        );

        Ok(Outcome::Success(CustomerDto::from(&customer)))
    }
}

pub struct UpdateCustomerHandler {
    customers: Arc<dyn Repository<Customer>>,
    uow: Arc<dyn UnitOfWork>,
}

impl UpdateCustomerHandler {
    pub fn new(scope: CustomerScope) -> Self {
        Self {
            customers: scope.customers,
            uow: scope.uow,
        }
    }
}

#[async_trait]
impl RequestHandler<UpdateCustomer> for UpdateCustomerHandler {
    async fn handle(&self, request: &UpdateCustomer) -> Result<Outcome<CustomerDto>, HandlerError> {
        let mut customer = match load(self.customers.as_ref(), request.id).await? {
            Ok(customer) => customer,
            Err(failure) => return Ok(failure.into()),
        };

        if let Err(e) =
            customer.update_contact(&request.name, &request.email, request.phone.as_deref())
        {
            return Ok(Failure::from(e).into());
        }

        self.customers.update(&customer);
        if let Err(e) = self.uow.save().await {
            return Ok(save_failure(e)?.into());
        }

        Ok(Outcome::Success(CustomerDto::from(&customer)))
    }
}

pub struct PromoteCustomerToVipHandler {
    customers: Arc<dyn Repository<Customer>>,
    uow: Arc<dyn UnitOfWork>,
}

impl PromoteCustomerToVipHandler {
    pub fn new(scope: CustomerScope) -> Self {
        Self {
            customers: scope.customers,
            uow: scope.uow,
        }
    }
}

#[async_trait]
impl RequestHandler<PromoteCustomerToVip> for PromoteCustomerToVipHandler {
    async fn handle(
        &self,
        request: &PromoteCustomerToVip,
    ) -> Result<Outcome<CustomerDto>, HandlerError> {
        let mut customer = match load(self.customers.as_ref(), request.id).await? {
            Ok(customer) => customer,
            Err(failure) => return Ok(failure.into()),
        };

        if let Err(e) = customer.promote_to_vip() {
            return Ok(Failure::from(e).into());
        }

        self.customers.update(&customer);
        if let Err(e) = self.uow.save().await {
            return Ok(save_failure(e)?.into());
        }
        tracing::info!(customer_id = %customer.id(), "Customer promoted to VIP");

        Ok(Outcome::Success(CustomerDto::from(&customer)))
    }
}

pub struct DeleteCustomerHandler {
    customers: Arc<dyn Repository<Customer>>,
    uow: Arc<dyn UnitOfWork>,
}

impl DeleteCustomerHandler {
    pub fn new(scope: CustomerScope) -> Self {
        Self {
            customers: scope.customers,
            uow: scope.uow,
        }
    }
}

#[async_trait]
impl RequestHandler<DeleteCustomer> for DeleteCustomerHandler {
    async fn handle(&self, request: &DeleteCustomer) -> Result<Outcome<()>, HandlerError> {
        let mut customer = match load(self.customers.as_ref(), request.id).await? {
            Ok(customer) => customer,
            Err(failure) => return Ok(failure.into()),
        };

        if let Err(e) = customer.mark_deleted() {
            return Ok(Failure::from(e).into());
        }

        self.customers.remove(&customer);
        if let Err(e) = self.uow.save().await {
            return Ok(save_failure(e)?.into());
        }
        tracing::info!(customer_id = %customer.id(), "Customer deleted");

        Ok(Outcome::Success(()))
    }
}
