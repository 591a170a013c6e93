use std::time::Instant;

use async_trait::async_trait;
use tracing::Instrument;

use crate::services::mediator::{
    Behavior, ErasedOutcome, HandlerError, Next, Outcome, RequestEnvelope,
};

/// Wraps the inner chain in a span carrying the request name and correlation
/// id, and logs start, end and elapsed time.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingBehavior;

#[async_trait]
impl Behavior for LoggingBehavior {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn handle(
        &self,
        request: &RequestEnvelope<'_>,
        next: Next<'_>,
    ) -> Result<ErasedOutcome, HandlerError> {
        let span = tracing::info_span!(
            "request",
            request = request.name(),
            correlation_id = %request.correlation_id()
        );

        async move {
            tracing::info!("Handling request");
            let started = Instant::now();
            let result = next.run(request).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match &result {
                Ok(Outcome::Success(_)) => {
                    tracing::info!(elapsed_ms, outcome = "success", "Request handled");
                }
                Ok(Outcome::Failure(failure)) => {
                    tracing::warn!(
                        elapsed_ms,
                        outcome = %failure.kind,
                        message = %failure.message,
                        field_errors = ?failure.field_errors,
                        "Request failed"
                    );
                }
                Err(error) => {
                    tracing::error!(elapsed_ms, error = %error, "Request errored");
                }
            }

            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::services::mediator::{
        DispatchError, Dispatcher, Failure, Request, RequestHandler, behaviors::PerformanceBehavior,
    };

    struct Lookup(&'static str);

    impl Request for Lookup {
        type Response = String;
    }

    struct LookupHandler;

    #[async_trait]
    impl RequestHandler<Lookup> for LookupHandler {
        async fn handle(&self, request: &Lookup) -> Result<Outcome<String>, HandlerError> {
            match request.0 {
                "broken" => Err(HandlerError::Failed("storage offline".to_string())),
                "missing" => Ok(Failure::not_found("Record", "missing").into()),
                key => Ok(Outcome::Success(key.to_uppercase())),
            }
        }
    }

    fn wrapped() -> Dispatcher {
        Dispatcher::builder()
            .with_behavior(LoggingBehavior)
            .with_behavior(PerformanceBehavior::new(Duration::ZERO))
            .with_handler::<Lookup, _, _>(|| LookupHandler)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn handler_error_passes_through_unchanged() {
        let err = wrapped().dispatch(Lookup("broken")).await.unwrap_err();

        match err {
            DispatchError::Handler(HandlerError::Failed(message)) => {
                assert_eq!(message, "storage offline")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn outcomes_pass_through_unchanged() {
        let dispatcher = wrapped();

        let found = dispatcher.dispatch(Lookup("key")).await.unwrap();
        assert_eq!(found, Outcome::Success("KEY".to_string()));

        let missing = dispatcher.dispatch(Lookup("missing")).await.unwrap();
        assert_eq!(missing, Outcome::Failure(Failure::not_found("Record", "missing")));
    }
}
