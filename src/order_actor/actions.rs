use crate::domain::{OrderStatus, TransitionPolicy};

/// Custom actions for Order entities.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderAction {
    /// Moves the order to `status` if `policy` allows it from the current status.
    ///
    /// # Errors
    /// Rejected when the policy forbids the transition, including setting the
    /// status the order already has.
    SetStatus {
        status: OrderStatus,
        policy: TransitionPolicy,
    },
}
