use std::sync::Arc;

use async_trait::async_trait;
use db::{
    Page, PageRequest, Repository,
    models::customer::{Customer, CustomerFilter, CustomerStatus, CustomerType},
};
use uuid::Uuid;

use super::{CUSTOMER, CustomerDto, CustomerScope};
use crate::services::mediator::{Failure, HandlerError, Outcome, Request, RequestHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetCustomerById {
    pub id: Uuid,
}

impl Request for GetCustomerById {
    type Response = CustomerDto;
}

/// One page of live customers matching every populated filter field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCustomers {
    pub name: Option<String>,
    pub email: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub status: Option<CustomerStatus>,
    pub page_number: u32,
    pub page_size: u32,
}

impl ListCustomers {
    pub fn page(page_number: u32, page_size: u32) -> Self {
        Self {
            name: None,
            email: None,
            customer_type: None,
            status: None,
            page_number,
            page_size,
        }
    }

    fn filter(&self) -> CustomerFilter {
        CustomerFilter {
            name: self.name.clone(),
            email: self.email.clone(),
            customer_type: self.customer_type,
            status: self.status,
            exclude_id: None,
        }
    }
}

impl Request for ListCustomers {
    type Response = Page<CustomerDto>;
}

pub struct GetCustomerByIdHandler {
    customers: Arc<dyn Repository<Customer>>,
}

impl GetCustomerByIdHandler {
    pub fn new(scope: CustomerScope) -> Self {
        Self {
            customers: scope.customers,
        }
    }
}

#[async_trait]
impl RequestHandler<GetCustomerById> for GetCustomerByIdHandler {
    async fn handle(&self, request: &GetCustomerById) -> Result<Outcome<CustomerDto>, HandlerError> {
        Ok(match self.customers.get_by_id(request.id).await? {
            Some(customer) => Outcome::Success(CustomerDto::from(&customer)),
            None => Failure::not_found(CUSTOMER, request.id).into(),
        })
    }
}

pub struct ListCustomersHandler {
    customers: Arc<dyn Repository<Customer>>,
}

impl ListCustomersHandler {
    pub fn new(scope: CustomerScope) -> Self {
        Self {
            customers: scope.customers,
        }
    }
}

#[async_trait]
impl RequestHandler<ListCustomers> for ListCustomersHandler {
    async fn handle(
        &self,
        request: &ListCustomers,
    ) -> Result<Outcome<Page<CustomerDto>>, HandlerError> {
        let page = match PageRequest::new(request.page_number, request.page_size) {
            Ok(page) => page,
            Err(e) => return Ok(Failure::validation(e.to_string(), vec![e.to_string()]).into()),
        };

        let customers = self.customers.get_paged(page, &request.filter()).await?;
        Ok(Outcome::Success(customers.map(|c| CustomerDto::from(&c))))
    }
}
