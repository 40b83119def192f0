use thiserror::Error;
use crate::actor_framework::FrameworkError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MenuError {
    #[error("Menu item not found: {0}")]
    NotFound(String),
    #[error("Menu item validation error: {0}")]
    ValidationError(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for MenuError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => MenuError::NotFound(id),
            FrameworkError::Rejected(message) => MenuError::ValidationError(message),
            other => MenuError::ActorCommunicationError(other.to_string()),
        }
    }
}
