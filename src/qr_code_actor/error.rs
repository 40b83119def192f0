use thiserror::Error;
use crate::actor_framework::FrameworkError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QrCodeError {
    #[error("QR code not found: {0}")]
    NotFound(String),
    #[error("QR code validation error: {0}")]
    ValidationError(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for QrCodeError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => QrCodeError::NotFound(id),
            FrameworkError::Rejected(message) => QrCodeError::ValidationError(message),
            other => QrCodeError::ActorCommunicationError(other.to_string()),
        }
    }
}
