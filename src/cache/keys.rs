use std::fmt;
use crate::domain::OrderStatus;

/// Identifies one cached query result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// A restaurant's orders, optionally narrowed to one status.
    /// Cached as `{"orders": [...]}`.
    Orders {
        restaurant_id: String,
        status: Option<OrderStatus>,
    },
    /// A single order's detail view, cached as `{"order": {...}}`.
    Order { order_id: String },
    /// A restaurant's menu, cached as `{"menuItems": [...]}`.
    MenuItems { restaurant_id: String },
}

impl QueryKey {
    pub fn orders(restaurant_id: impl Into<String>) -> Self {
        QueryKey::Orders {
            restaurant_id: restaurant_id.into(),
            status: None,
        }
    }

    pub fn orders_with_status(restaurant_id: impl Into<String>, status: OrderStatus) -> Self {
        QueryKey::Orders {
            restaurant_id: restaurant_id.into(),
            status: Some(status),
        }
    }

    pub fn order(order_id: impl Into<String>) -> Self {
        QueryKey::Order { order_id: order_id.into() }
    }

    pub fn menu_items(restaurant_id: impl Into<String>) -> Self {
        QueryKey::MenuItems { restaurant_id: restaurant_id.into() }
    }

    pub fn restaurant_id(&self) -> Option<&str> {
        match self {
            QueryKey::Orders { restaurant_id, .. } | QueryKey::MenuItems { restaurant_id } => Some(restaurant_id.as_str()),
            QueryKey::Order { .. } => None,
        }
    }

    /// Any orders collection belonging to `restaurant_id`, whatever its filter.
    pub fn is_orders_of(&self, restaurant_id: &str) -> bool {
        matches!(self, QueryKey::Orders { restaurant_id: id, .. } if id == restaurant_id)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::Orders { restaurant_id, status: None } => write!(f, "orders/{}", restaurant_id),
            QueryKey::Orders { restaurant_id, status: Some(status) } => {
                write!(f, "orders/{}/{}", restaurant_id, status)
            }
            QueryKey::Order { order_id } => write!(f, "order/{}", order_id),
            QueryKey::MenuItems { restaurant_id } => write!(f, "menu/{}", restaurant_id),
        }
    }
}
