use std::sync::Arc;

use async_trait::async_trait;

use crate::services::{
    mediator::{Behavior, ErasedOutcome, Failure, HandlerError, Next, Outcome, RequestEnvelope},
    validation::ValidatorRegistry,
};

/// Runs every validator registered for the request type and short-circuits
/// with a [`Failure`] on the first request that breaks a rule.
#[derive(Clone)]
pub struct ValidationBehavior {
    registry: Arc<ValidatorRegistry>,
}

impl ValidationBehavior {
    pub fn new(registry: Arc<ValidatorRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Behavior for ValidationBehavior {
    fn name(&self) -> &'static str {
        "validation"
    }

    async fn handle(
        &self,
        request: &RequestEnvelope<'_>,
        next: Next<'_>,
    ) -> Result<ErasedOutcome, HandlerError> {
        let violations = self.registry.validate(request).await?;
        if violations.is_empty() {
            return next.run(request).await;
        }

        tracing::debug!(
            request = request.name(),
            violations = violations.len(),
            "Validation rejected request"
        );
        Ok(Outcome::Failure(Failure::from_violations(violations)))
    }
}
