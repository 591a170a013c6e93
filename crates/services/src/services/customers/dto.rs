use chrono::{DateTime, Utc};
use db::{
    Auditable, Identified,
    models::customer::{Customer, CustomerStatus, CustomerType},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Customer as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(rename = "type")]
    pub customer_type: CustomerType,
    pub status: CustomerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Customer> for CustomerDto {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id(),
            name: customer.name().to_string(),
            email: customer.email().to_string(),
            phone: customer.phone().map(str::to_string),
            customer_type: customer.customer_type(),
            status: customer.status(),
            created_at: customer.created_at(),
            updated_at: customer.updated_at(),
        }
    }
}
