//! Menu item storage and validation.

pub mod entity;
pub mod error;

pub use error::*;
