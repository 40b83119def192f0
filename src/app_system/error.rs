use thiserror::Error;
use crate::board::BoardError;
use crate::menu_actor::MenuError;
use crate::order_actor::OrderError;
use crate::qr_code_actor::QrCodeError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Menu(#[from] MenuError),
    #[error(transparent)]
    QrCode(#[from] QrCodeError),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error("Shutdown failed: {0}")]
    Shutdown(String),
}
