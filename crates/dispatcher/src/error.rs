use thiserror::Error;

/// Errors raised while building an [`ActionDispatcher`](crate::ActionDispatcher).
///
/// Dispatching itself never fails; every dispatch ends in an
/// [`ActionResult`](opsdesk_core::ActionResult).
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// A configuration value is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),
}
