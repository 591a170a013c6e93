//! Composition of the customer request pipeline.

use std::{sync::Arc, time::Duration};

use super::{
    config::AppConfig,
    customers::{self, ScopeFactory},
    mediator::{
        DispatchError, Dispatcher,
        behaviors::{LoggingBehavior, PerformanceBehavior, ValidationBehavior},
    },
    notification::Notifier,
    validation::ValidatorRegistry,
};

/// Builds the dispatcher with logging, performance and validation behaviors
/// (outermost first) and every customer handler.
///
/// Fails when a customer request has no handler or more than one.
pub fn build_dispatcher(
    config: &AppConfig,
    scopes: Arc<dyn ScopeFactory>,
    notifier: Arc<dyn Notifier>,
) -> Result<Dispatcher, DispatchError> {
    let mut validators = ValidatorRegistry::new();
    customers::register_validators(&mut validators, Arc::clone(&scopes), config.max_page_size);

    let builder = Dispatcher::builder()
        .with_behavior(LoggingBehavior)
        .with_behavior(PerformanceBehavior::new(Duration::from_millis(
            config.slow_request_threshold_ms,
        )))
        .with_behavior(ValidationBehavior::new(Arc::new(validators)));

    let dispatcher = customers::register_handlers(builder, scopes, notifier).build()?;
    tracing::info!(
        requests = ?dispatcher.registered_requests(),
        behaviors = ?dispatcher.behavior_names(),
        "Request pipeline ready"
    );
    Ok(dispatcher)
}
