//! Request dispatch: routes each typed request to its single handler through
//! an ordered chain of behaviors.
//!
//! ```text
//! dispatch(req) -> behavior[0] -> behavior[1] -> ... -> handler
//!      result  <-      ...      <-     ...     <-  outcome
//! ```

mod behavior;
pub mod behaviors;
mod dispatcher;
mod outcome;
mod request;

pub use behavior::{AnyResponse, Behavior, ErasedOutcome, Next, RequestEnvelope};
pub use dispatcher::{DispatchError, Dispatcher, DispatcherBuilder};
pub use outcome::{Failure, FailureKind, Outcome};
pub use request::{HandlerError, Request, RequestHandler};
