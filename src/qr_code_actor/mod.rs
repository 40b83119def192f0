//! Table QR codes.

pub mod entity;
pub mod error;

pub use error::*;
