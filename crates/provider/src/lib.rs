pub mod booking;
pub mod context;
pub mod error;
pub mod escalation;
pub mod handler;
pub mod log;
pub mod message;
pub mod registry;

pub use booking::{BookingValidation, BookingValidator, RequireBookingId};
pub use context::Invocation;
pub use error::HandlerError;
pub use escalation::{EscalationDelivery, EscalationTransport};
pub use handler::{ActionHandler, DynActionHandler, HandlerReport};
pub use log::{LogEscalationTransport, LogMessageSender};
pub use message::MessageSender;
pub use registry::{HandlerInfo, HandlerKind, HandlerRegistry, RegisteredHandler};
