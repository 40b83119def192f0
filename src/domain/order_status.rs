use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where an order sits in the kitchen pipeline.
///
/// `Draft` is only produced by administrative creation and never appears as a
/// board column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Draft,
    Received,
    Preparing,
    Ready,
    Served,
    Cancelled,
}

const BOARD_COLUMNS: [OrderStatus; 5] = [
    OrderStatus::Received,
    OrderStatus::Preparing,
    OrderStatus::Ready,
    OrderStatus::Served,
    OrderStatus::Cancelled,
];

impl OrderStatus {
    /// The statuses shown as board columns, left to right.
    pub fn board_columns() -> &'static [OrderStatus] {
        &BOARD_COLUMNS
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "DRAFT",
            OrderStatus::Received => "RECEIVED",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::Served => "SERVED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Resolves a board column id. Only the five column labels are recognized.
    pub fn from_board_label(label: &str) -> Option<OrderStatus> {
        BOARD_COLUMNS.iter().copied().find(|status| status.as_str() == label)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Served | OrderStatus::Cancelled)
    }

    /// Position along RECEIVED → SERVED; `None` for statuses off the main line.
    fn pipeline_rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Received => Some(0),
            OrderStatus::Preparing => Some(1),
            OrderStatus::Ready => Some(2),
            OrderStatus::Served => Some(3),
            OrderStatus::Draft | OrderStatus::Cancelled => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(OrderStatus::Draft),
            other => OrderStatus::from_board_label(other).ok_or_else(|| UnknownStatus(other.to_string())),
        }
    }
}

/// Which status changes the order service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any board status may move to any other board status.
    #[default]
    Permissive,
    /// RECEIVED → PREPARING → READY → SERVED, with CANCELLED reachable from any
    /// non-terminal status.
    ForwardOnly,
}

impl TransitionPolicy {
    /// Whether the service accepts setting `to` on an order currently at `from`.
    ///
    /// Setting the status an order already has is an overwrite, not a move, and
    /// is accepted under every policy.
    pub fn allows(&self, from: OrderStatus, to: OrderStatus) -> bool {
        if to == OrderStatus::Draft {
            return false;
        }
        if from == to || from == OrderStatus::Draft {
            return true;
        }
        match self {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::ForwardOnly => {
                if from.is_terminal() {
                    return false;
                }
                if to == OrderStatus::Cancelled {
                    return true;
                }
                match (from.pipeline_rank(), to.pipeline_rank()) {
                    (Some(from), Some(to)) => to > from,
                    _ => false,
                }
            }
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "permissive" => Ok(TransitionPolicy::Permissive),
            "forward-only" | "forward_only" => Ok(TransitionPolicy::ForwardOnly),
            other => Err(format!("unknown transition policy '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for status in OrderStatus::board_columns() {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(*status));
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
        assert_eq!("DRAFT".parse::<OrderStatus>(), Ok(OrderStatus::Draft));
        assert!("preparing".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_draft_is_not_a_board_label() {
        assert_eq!(OrderStatus::from_board_label("DRAFT"), None);
        assert_eq!(OrderStatus::from_board_label("READY"), Some(OrderStatus::Ready));
        assert_eq!(OrderStatus::from_board_label("order_1"), None);
    }

    #[test]
    fn test_permissive_allows_backwards_moves() {
        let policy = TransitionPolicy::Permissive;
        assert!(policy.allows(OrderStatus::Served, OrderStatus::Received));
        assert!(policy.allows(OrderStatus::Cancelled, OrderStatus::Preparing));
        assert!(policy.allows(OrderStatus::Draft, OrderStatus::Received));
        assert!(policy.allows(OrderStatus::Ready, OrderStatus::Ready));
        assert!(!policy.allows(OrderStatus::Received, OrderStatus::Draft));
        assert!(!policy.allows(OrderStatus::Draft, OrderStatus::Draft));
    }

    #[test]
    fn test_forward_only_pipeline() {
        let policy = TransitionPolicy::ForwardOnly;
        assert!(policy.allows(OrderStatus::Received, OrderStatus::Preparing));
        assert!(policy.allows(OrderStatus::Received, OrderStatus::Ready));
        assert!(policy.allows(OrderStatus::Ready, OrderStatus::Served));
        assert!(!policy.allows(OrderStatus::Ready, OrderStatus::Preparing));
        assert!(!policy.allows(OrderStatus::Served, OrderStatus::Received));

        for from in [OrderStatus::Received, OrderStatus::Preparing, OrderStatus::Ready] {
            assert!(policy.allows(from, OrderStatus::Cancelled));
        }
        assert!(!policy.allows(OrderStatus::Served, OrderStatus::Cancelled));
        assert!(!policy.allows(OrderStatus::Cancelled, OrderStatus::Received));

        // Rewriting the current status is not a move.
        assert!(policy.allows(OrderStatus::Preparing, OrderStatus::Preparing));
        assert!(policy.allows(OrderStatus::Served, OrderStatus::Served));
    }

    #[test]
    fn test_policy_from_config_string() {
        assert_eq!("Forward-Only".parse::<TransitionPolicy>(), Ok(TransitionPolicy::ForwardOnly));
        assert_eq!("permissive".parse::<TransitionPolicy>(), Ok(TransitionPolicy::Permissive));
        assert!("strict".parse::<TransitionPolicy>().is_err());
    }
}
