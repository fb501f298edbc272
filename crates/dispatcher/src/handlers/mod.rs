//! Built-in action handlers.

mod device;
mod escalation;
mod message;

pub use device::{DeviceActionHandler, DevicePolicy};
pub use escalation::EscalationHandler;
pub use message::SendMessageHandler;

/// Restart the launch-monitor software on the customer's bay PC.
pub const RESET_TRACKMAN: &str = "reset_trackman";
/// Reboot the customer's bay PC.
pub const REBOOT_PC: &str = "reboot_pc";
/// Unlock the door of the customer's bay.
pub const UNLOCK_DOOR: &str = "unlock_door";
/// Hand the thread to staff.
pub const ESCALATE: &str = "escalate";
/// Message the customer.
pub const SEND_MESSAGE: &str = "send_message";
