use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::services::mediator::{Behavior, ErasedOutcome, HandlerError, Next, RequestEnvelope};

/// Warns when the inner chain takes longer than `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct PerformanceBehavior {
    threshold: Duration,
}

impl PerformanceBehavior {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }
}

#[async_trait]
impl Behavior for PerformanceBehavior {
    fn name(&self) -> &'static str {
        "performance"
    }

    async fn handle(
        &self,
        request: &RequestEnvelope<'_>,
        next: Next<'_>,
    ) -> Result<ErasedOutcome, HandlerError> {
        let started = Instant::now();
        let result = next.run(request).await;
        let elapsed = started.elapsed();
        if elapsed > self.threshold {
            tracing::warn!(
                request = request.name(),
                correlation_id = %request.correlation_id(),
                elapsed_ms = elapsed.as_millis() as u64,
                threshold_ms = self.threshold.as_millis() as u64,
                "Slow request"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::services::mediator::{DispatchError, Dispatcher, Outcome, Request, RequestHandler};

    struct Sleep(u64);

    impl Request for Sleep {
        type Response = u64;
    }

    struct SleepHandler;

    #[async_trait]
    impl RequestHandler<Sleep> for SleepHandler {
        async fn handle(&self, request: &Sleep) -> Result<Outcome<u64>, HandlerError> {
            if request.0 == 0 {
                return Err(HandlerError::Other(anyhow::anyhow!("nothing to wait for")));
            }
            tokio::time::sleep(Duration::from_millis(request.0)).await;
            Ok(Outcome::Success(request.0))
        }
    }

    fn timed(threshold: Duration) -> Dispatcher {
        Dispatcher::builder()
            .with_behavior(PerformanceBehavior::new(threshold))
            .with_handler::<Sleep, _, _>(|| SleepHandler)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn slow_requests_still_return_their_result() {
        let dispatcher = timed(Duration::from_millis(1));
        assert_eq!(dispatcher.dispatch(Sleep(5)).await.unwrap(), Outcome::Success(5));
    }

    #[tokio::test]
    async fn errors_are_not_swallowed() {
        let err = timed(Duration::from_secs(60))
            .dispatch(Sleep(0))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Handler(HandlerError::Other(_))));
        assert_eq!(err.to_string(), "nothing to wait for");
    }
}
