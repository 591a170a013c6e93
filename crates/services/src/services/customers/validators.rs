use std::sync::Arc;

use async_trait::async_trait;
use db::models::customer::{CustomerFilter, EMAIL_MAX_LEN, NAME_MAX_LEN, PHONE_MAX_LEN};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use super::{CreateCustomer, ListCustomers, ScopeFactory, UpdateCustomer};
use crate::services::{
    mediator::HandlerError,
    validation::{Rules, Validator, Violation},
};

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// E.164-style: optional `+`, no leading zero, 7 to 15 digits.
static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[1-9][0-9]{6,14}$").expect("valid phone regex"));

fn contact_rules(name: &str, email: &str, phone: Option<&str>) -> Rules {
    let mut rules = Rules::new();
    rules
        .required("name", name, "Name is required")
        .max_length(
            "name",
            name,
            NAME_MAX_LEN,
            &format!("Name must be at most {NAME_MAX_LEN} characters"),
        )
        .required("email", email, "Email is required")
        .max_length(
            "email",
            email,
            EMAIL_MAX_LEN,
            &format!("Email must be at most {EMAIL_MAX_LEN} characters"),
        )
        .matches("email", email, &EMAIL_PATTERN, "Email is not a valid address");

    if let Some(phone) = phone {
        rules
            .max_length(
                "phone",
                phone,
                PHONE_MAX_LEN,
                &format!("Phone must be at most {PHONE_MAX_LEN} characters"),
            )
            .matches("phone", phone, &PHONE_PATTERN, "Phone is not a valid number");
    }
    rules
}

/// Checks that no other live customer already uses `email`.
async fn ensure_email_free(
    scopes: &dyn ScopeFactory,
    email: &str,
    exclude: Option<Uuid>,
    rules: &mut Rules,
) -> Result<(), HandlerError> {
    let mut filter = CustomerFilter::by_email(email);
    if let Some(id) = exclude {
        filter = filter.excluding(id);
    }
    if scopes.scope().customers.count(&filter).await? > 0 {
        rules.push(Violation::conflict(
            "email",
            format!("Email '{}' is already in use", email.trim().to_lowercase()),
        ));
    }
    Ok(())
}

pub struct CreateCustomerValidator {
    scopes: Arc<dyn ScopeFactory>,
}

impl CreateCustomerValidator {
    pub fn new(scopes: Arc<dyn ScopeFactory>) -> Self {
        Self { scopes }
    }
}

#[async_trait]
impl Validator<CreateCustomer> for CreateCustomerValidator {
    async fn validate(&self, request: &CreateCustomer) -> Result<Vec<Violation>, HandlerError> {
        let mut rules = contact_rules(&request.name, &request.email, request.phone.as_deref());
        // Only hit the store once the input itself is sound.
        if rules.is_empty() {
            ensure_email_free(self.scopes.as_ref(), &request.email, None, &mut rules).await?;
        }
        Ok(rules.into_violations())
    }
}

pub struct UpdateCustomerValidator {
    scopes: Arc<dyn ScopeFactory>,
}

impl UpdateCustomerValidator {
    pub fn new(scopes: Arc<dyn ScopeFactory>) -> Self {
        Self { scopes }
    }
}

#[async_trait]
impl Validator<UpdateCustomer> for UpdateCustomerValidator {
    async fn validate(&self, request: &UpdateCustomer) -> Result<Vec<Violation>, HandlerError> {
        let mut rules = contact_rules(&request.name, &request.email, request.phone.as_deref());
        if rules.is_empty() {
            ensure_email_free(
                self.scopes.as_ref(),
                &request.email,
                Some(request.id),
                &mut rules,
            )
            .await?;
        }
        Ok(rules.into_violations())
    }
}

pub struct ListCustomersValidator {
    max_page_size: u32,
}

impl ListCustomersValidator {
    pub fn new(max_page_size: u32) -> Self {
        Self { max_page_size }
    }
}

#[async_trait]
impl Validator<ListCustomers> for ListCustomersValidator {
    async fn validate(&self, request: &ListCustomers) -> Result<Vec<Violation>, HandlerError> {
        let mut rules = Rules::new();
        rules
            .check(
                "pageNumber",
                request.page_number >= 1,
                "Page number must be at least 1",
            )
            .range(
                "pageSize",
                request.page_size,
                1..=self.max_page_size,
                &format!("Page size must be between 1 and {}", self.max_page_size),
            );
        Ok(rules.into_violations())
    }
}
