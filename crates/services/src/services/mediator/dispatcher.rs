//! Request dispatcher and its startup-time registration table.

use std::{
    any::TypeId,
    collections::{HashMap, HashSet},
    marker::PhantomData,
    sync::Arc,
};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::{
    AnyResponse, Behavior, ErasedOutcome, HandlerError, Next, Outcome, Request, RequestEnvelope,
    RequestHandler,
};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No handler registered for {0}")]
    NoHandler(&'static str),

    #[error("More than one handler registered for {0}")]
    DuplicateHandler(&'static str),

    #[error("No handler registered for expected requests: {}", .0.join(", "))]
    MissingHandlers(Vec<&'static str>),

    #[error("Handler for {0} produced an unexpected response type")]
    ResponseTypeMismatch(&'static str),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// Object-safe view of a typed handler.
#[async_trait]
pub(crate) trait ErasedHandler: Send + Sync {
    async fn call(&self, request: &RequestEnvelope<'_>) -> Result<ErasedOutcome, HandlerError>;
}

struct HandlerSlot<R, H> {
    handler: H,
    _request: PhantomData<fn(R)>,
}

#[async_trait]
impl<R, H> ErasedHandler for HandlerSlot<R, H>
where
    R: Request,
    H: RequestHandler<R>,
{
    async fn call(&self, request: &RequestEnvelope<'_>) -> Result<ErasedOutcome, HandlerError> {
        let typed = request.downcast_ref::<R>().ok_or_else(|| {
            HandlerError::Failed(format!(
                "{} received a request of another type",
                R::name()
            ))
        })?;
        let outcome = self.handler.handle(typed).await?;
        Ok(outcome.map(|response| Box::new(response) as AnyResponse))
    }
}

/// Builds a fresh handler for every dispatch.
trait HandlerFactory: Send + Sync {
    fn create(&self) -> Box<dyn ErasedHandler>;
}

struct FactorySlot<R, H, F> {
    factory: F,
    _marker: PhantomData<fn(R) -> H>,
}

impl<R, H, F> HandlerFactory for FactorySlot<R, H, F>
where
    R: Request,
    H: RequestHandler<R> + 'static,
    F: Fn() -> H + Send + Sync,
{
    fn create(&self) -> Box<dyn ErasedHandler> {
        Box::new(HandlerSlot::<R, H> {
            handler: (self.factory)(),
            _request: PhantomData,
        })
    }
}

struct Registration {
    type_id: TypeId,
    request_name: &'static str,
    factory: Arc<dyn HandlerFactory>,
}

/// Routes requests to handlers through the behavior chain.
///
/// Behaviors run in registration order on the way in: the first one
/// registered is the outermost and sees the final result last.
pub struct Dispatcher {
    behaviors: Vec<Arc<dyn Behavior>>,
    handlers: HashMap<TypeId, Arc<dyn HandlerFactory>>,
    request_names: Vec<&'static str>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Runs `request` through every behavior and its handler.
    ///
    /// Expected business outcomes arrive as `Ok(Outcome::Failure(_))`; `Err`
    /// is reserved for configuration and infrastructure problems.
    pub async fn dispatch<R: Request>(
        &self,
        request: R,
    ) -> Result<Outcome<R::Response>, DispatchError> {
        let factory = self
            .handlers
            .get(&TypeId::of::<R>())
            .ok_or(DispatchError::NoHandler(R::name()))?;
        let handler = factory.create();

        let envelope = RequestEnvelope::new(&request, Uuid::new_v4());
        let outcome = Next::new(&self.behaviors, handler.as_ref())
            .run(&envelope)
            .await?;

        match outcome {
            Outcome::Success(response) => response
                .downcast::<R::Response>()
                .map(|response| Outcome::Success(*response))
                .map_err(|_| DispatchError::ResponseTypeMismatch(R::name())),
            Outcome::Failure(failure) => Ok(Outcome::Failure(failure)),
        }
    }

    pub fn is_registered<R: Request>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<R>())
    }

    /// Names of every registered request type, in registration order.
    pub fn registered_requests(&self) -> &[&'static str] {
        &self.request_names
    }

    /// Names of the behaviors, outermost first.
    pub fn behavior_names(&self) -> Vec<&'static str> {
        self.behaviors.iter().map(|b| b.name()).collect()
    }
}

/// Builder for constructing a [`Dispatcher`].
pub struct DispatcherBuilder {
    behaviors: Vec<Arc<dyn Behavior>>,
    registrations: Vec<Registration>,
    expected: Vec<(TypeId, &'static str)>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            behaviors: Vec::new(),
            registrations: Vec::new(),
            expected: Vec::new(),
        }
    }

    /// Appends a behavior. Earlier behaviors wrap later ones.
    pub fn with_behavior<B: Behavior + 'static>(mut self, behavior: B) -> Self {
        self.behaviors.push(Arc::new(behavior));
        self
    }

    /// Registers the handler for `R`. `factory` runs once per dispatch.
    pub fn with_handler<R, H, F>(mut self, factory: F) -> Self
    where
        R: Request,
        H: RequestHandler<R> + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.registrations.push(Registration {
            type_id: TypeId::of::<R>(),
            request_name: R::name(),
            factory: Arc::new(FactorySlot::<R, H, F> {
                factory,
                _marker: PhantomData,
            }),
        });
        self
    }

    /// Declares that `R` will be dispatched, so `build` fails if it has no handler.
    pub fn expect<R: Request>(mut self) -> Self {
        self.expected.push((TypeId::of::<R>(), R::name()));
        self
    }

    /// Validates the registration table.
    ///
    /// Fails when a request type has more than one handler, or an expected
    /// request type has none.
    pub fn build(self) -> Result<Dispatcher, DispatchError> {
        let mut handlers = HashMap::with_capacity(self.registrations.len());
        let mut request_names = Vec::with_capacity(self.registrations.len());
        for registration in self.registrations {
            if handlers
                .insert(registration.type_id, registration.factory)
                .is_some()
            {
                return Err(DispatchError::DuplicateHandler(registration.request_name));
            }
            request_names.push(registration.request_name);
        }

        let mut seen = HashSet::new();
        let missing: Vec<_> = self
            .expected
            .into_iter()
            .filter(|(type_id, _)| !handlers.contains_key(type_id) && seen.insert(*type_id))
            .map(|(_, name)| name)
            .collect();
        if !missing.is_empty() {
            return Err(DispatchError::MissingHandlers(missing));
        }

        tracing::debug!(
            handlers = request_names.len(),
            behaviors = self.behaviors.len(),
            "Dispatcher built"
        );

        Ok(Dispatcher {
            behaviors: self.behaviors,
            handlers,
            request_names,
        })
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::services::mediator::Failure;

    struct Ping(u32);

    impl Request for Ping {
        type Response = u32;
    }

    struct Unrouted;

    impl Request for Unrouted {
        type Response = ();
    }

    struct PingHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RequestHandler<Ping> for PingHandler {
        async fn handle(&self, request: &Ping) -> Result<Outcome<u32>, HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Outcome::Success(request.0 + 1))
        }
    }

    /// Records entry and exit into a shared journal.
    struct Journal {
        name: &'static str,
        entries: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Behavior for Journal {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn handle(
            &self,
            request: &RequestEnvelope<'_>,
            next: Next<'_>,
        ) -> Result<ErasedOutcome, HandlerError> {
            self.entries.lock().unwrap().push(format!("{} in", self.name));
            let result = next.run(request).await;
            self.entries.lock().unwrap().push(format!("{} out", self.name));
            result
        }
    }

    struct Reject;

    #[async_trait]
    impl Behavior for Reject {
        fn name(&self) -> &'static str {
            "reject"
        }

        async fn handle(
            &self,
            _request: &RequestEnvelope<'_>,
            _next: Next<'_>,
        ) -> Result<ErasedOutcome, HandlerError> {
            Ok(Outcome::Failure(Failure::validation(
                "rejected",
                vec!["nope".to_string()],
            )))
        }
    }

    fn ping_dispatcher(builder: DispatcherBuilder, calls: &Arc<AtomicUsize>) -> Dispatcher {
        let calls = Arc::clone(calls);
        builder
            .with_handler::<Ping, _, _>(move || PingHandler {
                calls: Arc::clone(&calls),
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn dispatch_routes_to_registered_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = ping_dispatcher(Dispatcher::builder(), &calls);

        let outcome = dispatcher.dispatch(Ping(41)).await.unwrap();
        assert_eq!(outcome, Outcome::Success(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(dispatcher.is_registered::<Ping>());
        assert_eq!(dispatcher.registered_requests(), &["Ping"]);
    }

    #[tokio::test]
    async fn behaviors_nest_like_an_onion() {
        let entries = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        let builder = Dispatcher::builder()
            .with_behavior(Journal {
                name: "outer",
                entries: Arc::clone(&entries),
            })
            .with_behavior(Journal {
                name: "inner",
                entries: Arc::clone(&entries),
            });
        let dispatcher = ping_dispatcher(builder, &calls);

        dispatcher.dispatch(Ping(1)).await.unwrap();

        assert_eq!(
            *entries.lock().unwrap(),
            vec!["outer in", "inner in", "inner out", "outer out"]
        );
        assert_eq!(dispatcher.behavior_names(), vec!["outer", "inner"]);
    }

    #[tokio::test]
    async fn short_circuit_skips_inner_stages() {
        let entries = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        let builder = Dispatcher::builder()
            .with_behavior(Journal {
                name: "outer",
                entries: Arc::clone(&entries),
            })
            .with_behavior(Reject)
            .with_behavior(Journal {
                name: "inner",
                entries: Arc::clone(&entries),
            });
        let dispatcher = ping_dispatcher(builder, &calls);

        let outcome = dispatcher.dispatch(Ping(1)).await.unwrap();

        assert_eq!(outcome.failure().unwrap().field_errors, vec!["nope"]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(*entries.lock().unwrap(), vec!["outer in", "outer out"]);
    }

    #[tokio::test]
    async fn handler_is_built_per_dispatch() {
        let built = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = {
            let built = Arc::clone(&built);
            let calls = Arc::clone(&calls);
            Dispatcher::builder()
                .with_handler::<Ping, _, _>(move || {
                    built.fetch_add(1, Ordering::SeqCst);
                    PingHandler {
                        calls: Arc::clone(&calls),
                    }
                })
                .build()
                .unwrap()
        };

        dispatcher.dispatch(Ping(1)).await.unwrap();
        dispatcher.dispatch(Ping(2)).await.unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unregistered_request_is_an_error() {
        let dispatcher = Dispatcher::builder().build().unwrap();
        let err = dispatcher.dispatch(Unrouted).await.unwrap_err();
        assert!(matches!(err, DispatchError::NoHandler("Unrouted")));
    }

    #[test]
    fn duplicate_handler_fails_at_build() {
        let calls = Arc::new(AtomicUsize::new(0));
        let first = Arc::clone(&calls);
        let second = Arc::clone(&calls);
        let result = Dispatcher::builder()
            .with_handler::<Ping, _, _>(move || PingHandler {
                calls: Arc::clone(&first),
            })
            .with_handler::<Ping, _, _>(move || PingHandler {
                calls: Arc::clone(&second),
            })
            .build();

        assert!(matches!(result, Err(DispatchError::DuplicateHandler("Ping"))));
    }

    #[test]
    fn missing_expected_handler_fails_at_build() {
        let result = Dispatcher::builder()
            .expect::<Unrouted>()
            .expect::<Unrouted>()
            .build();

        match result {
            Err(DispatchError::MissingHandlers(names)) => assert_eq!(names, vec!["Unrouted"]),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("build should fail"),
        }
    }
}
