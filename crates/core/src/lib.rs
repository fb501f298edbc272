pub mod action;
pub mod circuit_breaker;
pub mod device;
pub mod event;
pub mod outcome;
pub mod status;

pub use action::{ActionContext, ActionRequest, SopConfig, ThreadContext};
pub use circuit_breaker::CircuitBreakerStatus;
pub use device::{DeviceIdentity, DeviceKey};
pub use event::DispatchEvent;
pub use outcome::{ActionResult, OutcomeKind, ReportedOutcome, UnknownOutcome};
pub use status::{Performer, StatusTransition, ThreadStatus};
