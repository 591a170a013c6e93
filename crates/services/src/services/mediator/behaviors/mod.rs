//! Stock behaviors. Registration order is the nesting order.

mod logging;
mod performance;
mod validation;

pub use logging::LoggingBehavior;
pub use performance::PerformanceBehavior;
pub use validation::ValidationBehavior;
