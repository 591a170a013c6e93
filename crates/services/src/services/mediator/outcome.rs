use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Expected, recoverable reasons a request did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// One or more input rules were violated.
    Validation,
    /// The target entity is absent or soft-deleted.
    NotFound,
    /// A uniqueness rule or a concurrent write got in the way.
    Conflict,
    /// An entity rejected the requested state transition.
    DomainRule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    pub field_errors: Vec<String>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field_errors: Vec::new(),
        }
    }

    pub fn validation(message: impl Into<String>, field_errors: Vec<String>) -> Self {
        Self {
            kind: FailureKind::Validation,
            message: message.into(),
            field_errors,
        }
    }

    pub fn not_found(entity: &str, id: impl fmt::Display) -> Self {
        Self::new(FailureKind::NotFound, format!("{entity} {id} not found"))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Conflict, message)
    }

    pub fn domain_rule(message: impl Into<String>) -> Self {
        Self::new(FailureKind::DomainRule, message)
    }

    pub fn with_field_errors(mut self, field_errors: Vec<String>) -> Self {
        self.field_errors = field_errors;
        self
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if !self.field_errors.is_empty() {
            write!(f, " ({})", self.field_errors.join("; "))?;
        }
        Ok(())
    }
}

/// Result of a dispatched request: exactly one of a value or a [`Failure`].
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Outcome<T> {
    Success(T),
    Failure(Failure),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(failure) => Some(failure),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Failure(failure) => Outcome::Failure(failure),
        }
    }

    pub fn into_result(self) -> Result<T, Failure> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(failure) => Err(failure),
        }
    }
}

impl<T> From<Failure> for Outcome<T> {
    fn from(failure: Failure) -> Self {
        Outcome::Failure(failure)
    }
}
