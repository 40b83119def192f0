use thiserror::Error;
use crate::cache::CacheError;
use crate::menu_actor::MenuError;
use crate::order_actor::OrderError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BoardError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Order service error: {0}")]
    Order(#[from] OrderError),
    #[error("Menu service error: {0}")]
    Menu(#[from] MenuError),
    #[error("Unexpected cached shape: {0}")]
    Shape(String),
}
