use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, Type};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    entity::{Auditable, Entity, Identified, SoftDeletable, Versioned},
    repository::{SqlEntity, SqlFilter},
};

pub const NAME_MAX_LEN: usize = 100;
pub const EMAIL_MAX_LEN: usize = 254;
pub const PHONE_MAX_LEN: usize = 20;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, EnumString, Display, Default,
)]
#[sqlx(type_name = "customer_type", rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CustomerType {
    #[default]
    #[serde(alias = "regular", alias = "REGULAR")]
    Regular,
    #[serde(alias = "vip", alias = "VIP")]
    Vip,
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, EnumString, Display, Default,
)]
#[sqlx(type_name = "customer_status", rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CustomerStatus {
    #[default]
    #[serde(alias = "active", alias = "ACTIVE")]
    Active,
    #[serde(alias = "inactive", alias = "INACTIVE")]
    Inactive,
}

/// Business rule rejected by a `Customer` constructor or state transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Name is required")]
    NameRequired,
    #[error("Name must be at most {} characters", NAME_MAX_LEN)]
    NameTooLong,
    #[error("Email '{0}' is not a valid address")]
    InvalidEmail(String),
    #[error("Phone must be at most {} characters", PHONE_MAX_LEN)]
    PhoneTooLong,
    #[error("Customer is already VIP")]
    AlreadyVip,
    #[error("Customer is inactive")]
    Inactive,
    #[error("Customer is already {0}")]
    StatusUnchanged(CustomerStatus),
    #[error("Customer has been deleted")]
    Deleted,
}

impl DomainError {
    /// Input field the rule applies to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            DomainError::NameRequired | DomainError::NameTooLong => Some("name"),
            DomainError::InvalidEmail(_) => Some("email"),
            DomainError::PhoneTooLong => Some("phone"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Customer {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    customer_type: CustomerType,
    status: CustomerStatus,
    is_deleted: bool,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Customer {
    /// New `Regular`, `Active` customer. Email is stored lowercase.
    pub fn new(name: &str, email: &str, phone: Option<&str>) -> Result<Self, DomainError> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: normalize_name(name)?,
            email: normalize_email(email)?,
            phone: normalize_phone(phone)?,
            customer_type: CustomerType::Regular,
            status: CustomerStatus::Active,
            is_deleted: false,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn customer_type(&self) -> CustomerType {
        self.customer_type
    }

    pub fn status(&self) -> CustomerStatus {
        self.status
    }

    pub fn update_contact(
        &mut self,
        name: &str,
        email: &str,
        phone: Option<&str>,
    ) -> Result<(), DomainError> {
        self.ensure_not_deleted()?;
        let name = normalize_name(name)?;
        let email = normalize_email(email)?;
        let phone = normalize_phone(phone)?;

        self.name = name;
        self.email = email;
        self.phone = phone;
        self.touch();
        Ok(())
    }

    pub fn promote_to_vip(&mut self) -> Result<(), DomainError> {
        self.ensure_not_deleted()?;
        if self.customer_type == CustomerType::Vip {
            return Err(DomainError::AlreadyVip);
        }
        if self.status == CustomerStatus::Inactive {
            return Err(DomainError::Inactive);
        }
        self.customer_type = CustomerType::Vip;
        self.touch();
        Ok(())
    }

    pub fn deactivate(&mut self) -> Result<(), DomainError> {
        self.change_status(CustomerStatus::Inactive)
    }

    pub fn activate(&mut self) -> Result<(), DomainError> {
        self.change_status(CustomerStatus::Active)
    }

    /// Irreversible. There is no way back from a deleted state.
    pub fn mark_deleted(&mut self) -> Result<(), DomainError> {
        self.ensure_not_deleted()?;
        self.is_deleted = true;
        self.touch();
        Ok(())
    }

    fn change_status(&mut self, status: CustomerStatus) -> Result<(), DomainError> {
        self.ensure_not_deleted()?;
        if self.status == status {
            return Err(DomainError::StatusUnchanged(status));
        }
        self.status = status;
        self.touch();
        Ok(())
    }

    fn ensure_not_deleted(&self) -> Result<(), DomainError> {
        if self.is_deleted {
            return Err(DomainError::Deleted);
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn normalize_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::NameRequired);
    }
    if name.chars().count() > NAME_MAX_LEN {
        return Err(DomainError::NameTooLong);
    }
    Ok(name.to_string())
}

fn normalize_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && email.len() <= EMAIL_MAX_LEN
        }
        None => false,
    };
    if !valid {
        return Err(DomainError::InvalidEmail(email));
    }
    Ok(email)
}

fn normalize_phone(phone: Option<&str>) -> Result<Option<String>, DomainError> {
    match phone.map(str::trim) {
        None | Some("") => Ok(None),
        Some(phone) if phone.chars().count() > PHONE_MAX_LEN => Err(DomainError::PhoneTooLong),
        Some(phone) => Ok(Some(phone.to_string())),
    }
}

impl Identified for Customer {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Auditable for Customer {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl SoftDeletable for Customer {
    fn is_deleted(&self) -> bool {
        self.is_deleted
    }
}

impl Versioned for Customer {
    fn version(&self) -> i64 {
        self.version
    }
}

impl Entity for Customer {
    type Filter = CustomerFilter;

    const NAME: &'static str = "customer";
}

impl SqlEntity for Customer {
    const TABLE: &'static str = "customers";
    const COLUMNS: &'static str = "id, name, email, phone, customer_type, status, is_deleted, \
                                   version, created_at, updated_at";
    const ORDER_BY: &'static str = "created_at ASC, id ASC";

    fn insert_query(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            Self::TABLE,
            Self::COLUMNS
        ));
        {
            let mut values = qb.separated(", ");
            values
                .push_bind(self.id)
                .push_bind(self.name.clone())
                .push_bind(self.email.clone())
                .push_bind(self.phone.clone())
                .push_bind(self.customer_type)
                .push_bind(self.status)
                .push_bind(self.is_deleted)
                .push_bind(self.version)
                .push_bind(self.created_at)
                .push_bind(self.updated_at);
            values.push_unseparated(")");
        }
        qb
    }

    fn push_update_assignments(&self, qb: &mut QueryBuilder<'static, Sqlite>) {
        let mut set = qb.separated(", ");
        set.push("name = ").push_bind_unseparated(self.name.clone());
        set.push("email = ").push_bind_unseparated(self.email.clone());
        set.push("phone = ").push_bind_unseparated(self.phone.clone());
        set.push("customer_type = ")
            .push_bind_unseparated(self.customer_type);
        set.push("status = ").push_bind_unseparated(self.status);
        set.push("updated_at = ").push_bind_unseparated(self.updated_at);
    }
}

/// Search predicate for customers. Empty fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerFilter {
    /// Case-insensitive substring match.
    pub name: Option<String>,
    /// Exact match after normalisation.
    pub email: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub status: Option<CustomerStatus>,
    pub exclude_id: Option<Uuid>,
}

impl CustomerFilter {
    pub fn by_email(email: &str) -> Self {
        Self {
            email: Some(email.to_string()),
            ..Self::default()
        }
    }

    pub fn excluding(mut self, id: Uuid) -> Self {
        self.exclude_id = Some(id);
        self
    }
}

impl SqlFilter for CustomerFilter {
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            qb.push(" AND name LIKE ")
                .push_bind(format!("%{}%", escape_like(name)))
                .push(" ESCAPE '\\'");
        }
        if let Some(email) = self.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            qb.push(" AND email = ").push_bind(email.to_lowercase());
        }
        if let Some(customer_type) = self.customer_type {
            qb.push(" AND customer_type = ").push_bind(customer_type);
        }
        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(id) = self.exclude_id {
            qb.push(" AND id != ").push_bind(id);
        }
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn john() -> Customer {
        Customer::new("John Doe", "john@example.com", Some("+1234567890")).unwrap()
    }

    #[test]
    fn new_customer_is_regular_and_active() {
        let customer = john();
        assert_eq!(customer.name(), "John Doe");
        assert_eq!(customer.email(), "john@example.com");
        assert_eq!(customer.phone(), Some("+1234567890"));
        assert_eq!(customer.customer_type(), CustomerType::Regular);
        assert_eq!(customer.status(), CustomerStatus::Active);
        assert!(!customer.is_deleted());
        assert_eq!(customer.version(), 0);
    }

    #[test]
    fn new_customer_normalises_input() {
        let customer = Customer::new("  Jane  ", " Jane@Example.COM ", Some("   ")).unwrap();
        assert_eq!(customer.name(), "Jane");
        assert_eq!(customer.email(), "jane@example.com");
        assert_eq!(customer.phone(), None);
    }

    #[test]
    fn constructor_rejects_invalid_input() {
        assert_eq!(
            Customer::new("   ", "a@b.c", None).unwrap_err(),
            DomainError::NameRequired
        );
        assert_eq!(
            Customer::new(&"x".repeat(NAME_MAX_LEN + 1), "a@b.c", None).unwrap_err(),
            DomainError::NameTooLong
        );
        assert!(matches!(
            Customer::new("Ann", "not-an-email", None).unwrap_err(),
            DomainError::InvalidEmail(_)
        ));
        assert!(matches!(
            Customer::new("Ann", "a@b@c", None).unwrap_err(),
            DomainError::InvalidEmail(_)
        ));
        assert_eq!(
            Customer::new("Ann", "a@b.c", Some(&"1".repeat(PHONE_MAX_LEN + 1))).unwrap_err(),
            DomainError::PhoneTooLong
        );
    }

    #[test]
    fn promote_twice_is_rejected() {
        let mut customer = john();
        customer.promote_to_vip().unwrap();
        assert_eq!(customer.customer_type(), CustomerType::Vip);

        assert_eq!(customer.promote_to_vip(), Err(DomainError::AlreadyVip));
        assert_eq!(customer.customer_type(), CustomerType::Vip);
    }

    #[test]
    fn inactive_customer_cannot_be_promoted() {
        let mut customer = john();
        customer.deactivate().unwrap();
        assert_eq!(customer.promote_to_vip(), Err(DomainError::Inactive));
        assert_eq!(
            customer.deactivate(),
            Err(DomainError::StatusUnchanged(CustomerStatus::Inactive))
        );
        customer.activate().unwrap();
        customer.promote_to_vip().unwrap();
    }

    #[test]
    fn deletion_is_irreversible() {
        let mut customer = john();
        customer.mark_deleted().unwrap();
        assert!(customer.is_deleted());

        assert_eq!(customer.mark_deleted(), Err(DomainError::Deleted));
        assert_eq!(customer.activate(), Err(DomainError::Deleted));
        assert_eq!(customer.promote_to_vip(), Err(DomainError::Deleted));
        assert_eq!(
            customer.update_contact("John", "john@example.com", None),
            Err(DomainError::Deleted)
        );
    }

    #[test]
    fn failed_update_leaves_customer_untouched() {
        let mut customer = john();
        let before = customer.clone();
        assert!(customer.update_contact("New", "broken", None).is_err());
        assert_eq!(customer, before);
    }

    #[test]
    fn like_patterns_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn status_parses_from_query_strings() {
        use std::str::FromStr;
        assert_eq!(CustomerType::from_str("VIP").unwrap(), CustomerType::Vip);
        assert_eq!(CustomerStatus::from_str("inactive").unwrap(), CustomerStatus::Inactive);
        assert_eq!(CustomerType::Vip.to_string(), "vip");
    }
}
