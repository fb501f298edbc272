//! Slack escalation transport.
//!
//! Posts escalations to a channel through the Slack Web API
//! `chat.postMessage` method.

pub mod config;
pub mod error;
pub mod transport;
mod types;

pub use config::SlackConfig;
pub use error::SlackError;
pub use transport::SlackEscalationTransport;
