use thiserror::Error;
use crate::actor_framework::FrameworkError;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Invalid menu item: {0}")]
    InvalidMenuItem(String),
    #[error("Invalid table: {0}")]
    InvalidTable(String),
    #[error("Order validation error: {0}")]
    ValidationError(String),
    /// Refusal from the order service, carried verbatim for display.
    #[error("{0}")]
    Rejected(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for OrderError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => OrderError::NotFound(id),
            FrameworkError::Rejected(message) => OrderError::Rejected(message),
            other => OrderError::ActorCommunicationError(other.to_string()),
        }
    }
}
