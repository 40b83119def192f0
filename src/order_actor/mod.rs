//! Order-specific domain logic: creation checks and status transitions.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
