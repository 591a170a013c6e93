//! Per-request-type validators and the registry the validation behavior reads.

use std::{
    any::TypeId,
    collections::HashMap,
    marker::PhantomData,
    sync::Arc,
};

use async_trait::async_trait;
use serde::Serialize;

use crate::services::mediator::{Failure, FailureKind, HandlerError, Request, RequestEnvelope};

mod rules;

pub use rules::Rules;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// The value breaks a format or range rule.
    Invalid,
    /// The value collides with existing state, e.g. a taken email.
    Conflict,
}

/// One broken rule on one input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: &'static str,
    pub message: String,
    pub kind: ViolationKind,
}

impl Violation {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
            kind: ViolationKind::Invalid,
        }
    }

    pub fn conflict(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
            kind: ViolationKind::Conflict,
        }
    }
}

impl Failure {
    /// Collapses violations into one failure, keeping their order.
    ///
    /// The kind is [`FailureKind::Conflict`] when any violation is a conflict.
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        let conflict = violations
            .iter()
            .find(|v| v.kind == ViolationKind::Conflict)
            .map(|v| v.message.clone());
        let field_errors = violations.into_iter().map(|v| v.message).collect();
        match conflict {
            Some(message) => {
                Failure::new(FailureKind::Conflict, message).with_field_errors(field_errors)
            }
            None => Failure::validation("Validation failed", field_errors),
        }
    }
}

/// Input rules for one request type.
///
/// Validators may be async so they can consult the store, but they must not
/// write to it.
#[async_trait]
pub trait Validator<R: Request>: Send + Sync {
    async fn validate(&self, request: &R) -> Result<Vec<Violation>, HandlerError>;
}

#[async_trait]
trait ErasedValidator: Send + Sync {
    async fn validate(&self, request: &RequestEnvelope<'_>) -> Result<Vec<Violation>, HandlerError>;
}

struct ValidatorSlot<R, V> {
    validator: V,
    _request: PhantomData<fn(R)>,
}

#[async_trait]
impl<R, V> ErasedValidator for ValidatorSlot<R, V>
where
    R: Request,
    V: Validator<R>,
{
    async fn validate(&self, request: &RequestEnvelope<'_>) -> Result<Vec<Violation>, HandlerError> {
        match request.downcast_ref::<R>() {
            Some(typed) => self.validator.validate(typed).await,
            None => Ok(Vec::new()),
        }
    }
}

/// Validators keyed by request type, kept in registration order.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: HashMap<TypeId, Vec<Arc<dyn ErasedValidator>>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<R, V>(&mut self, validator: V)
    where
        R: Request,
        V: Validator<R> + 'static,
    {
        self.validators
            .entry(TypeId::of::<R>())
            .or_default()
            .push(Arc::new(ValidatorSlot::<R, V> {
                validator,
                _request: PhantomData,
            }));
    }

    pub fn with<R, V>(mut self, validator: V) -> Self
    where
        R: Request,
        V: Validator<R> + 'static,
    {
        self.register::<R, V>(validator);
        self
    }

    pub fn count_for<R: Request>(&self) -> usize {
        self.validators
            .get(&TypeId::of::<R>())
            .map_or(0, Vec::len)
    }

    /// Runs every validator for the request's type and concatenates their
    /// violations. An unknown type yields no violations.
    pub async fn validate(
        &self,
        request: &RequestEnvelope<'_>,
    ) -> Result<Vec<Violation>, HandlerError> {
        let Some(validators) = self.validators.get(&request.type_id()) else {
            return Ok(Vec::new());
        };

        let mut violations = Vec::new();
        for validator in validators {
            violations.extend(validator.validate(request).await?);
        }
        Ok(violations)
    }
}
