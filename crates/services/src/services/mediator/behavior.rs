use std::{
    any::{Any, TypeId},
    sync::Arc,
};

use async_trait::async_trait;
use uuid::Uuid;

use super::{HandlerError, Outcome, Request, dispatcher::ErasedHandler};

/// Type-erased handler response travelling through the behavior chain.
pub type AnyResponse = Box<dyn Any + Send>;
pub type ErasedOutcome = Outcome<AnyResponse>;

/// A request as seen by behaviors: its identity plus a borrowed payload.
pub struct RequestEnvelope<'a> {
    name: &'static str,
    type_id: TypeId,
    correlation_id: Uuid,
    payload: &'a (dyn Any + Send + Sync),
}

impl<'a> RequestEnvelope<'a> {
    pub fn new<R: Request>(request: &'a R, correlation_id: Uuid) -> Self {
        Self {
            name: R::name(),
            type_id: TypeId::of::<R>(),
            correlation_id,
            payload: request,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn downcast_ref<R: Request>(&self) -> Option<&'a R> {
        let payload: &'a (dyn Any + Send + Sync) = self.payload;
        payload.downcast_ref::<R>()
    }
}

/// Cross-cutting stage wrapped around handler execution.
///
/// Call `next.run(request)` to continue down the chain, or return early to
/// short-circuit. Skipping `next` means no inner behavior or handler runs.
#[async_trait]
pub trait Behavior: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(
        &self,
        request: &RequestEnvelope<'_>,
        next: Next<'_>,
    ) -> Result<ErasedOutcome, HandlerError>;
}

/// The remainder of the chain after the current behavior.
pub struct Next<'a> {
    behaviors: &'a [Arc<dyn Behavior>],
    handler: &'a dyn ErasedHandler,
}

impl<'a> Next<'a> {
    pub(crate) fn new(behaviors: &'a [Arc<dyn Behavior>], handler: &'a dyn ErasedHandler) -> Self {
        Self { behaviors, handler }
    }

    pub async fn run(self, request: &RequestEnvelope<'_>) -> Result<ErasedOutcome, HandlerError> {
        match self.behaviors.split_first() {
            Some((behavior, inner)) => {
                tracing::trace!(
                    behavior = behavior.name(),
                    request = request.name(),
                    "Entering behavior"
                );
                behavior.handle(request, Next::new(inner, self.handler)).await
            }
            None => self.handler.call(request).await,
        }
    }
}
