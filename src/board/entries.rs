//! Edits on cached order collections (`{"orders": [...]}`).
//!
//! Every function here leaves a value without an `orders` array untouched.

use std::collections::HashSet;
use serde_json::Value;
use crate::domain::OrderStatus;

fn orders_mut(value: &mut Value) -> Option<&mut Vec<Value>> {
    value.get_mut("orders").and_then(Value::as_array_mut)
}

fn order_id(order: &Value) -> Option<&str> {
    order.get("id").and_then(Value::as_str)
}

/// Sets `status` and `updatedAt` on every listed order; true if any matched.
pub fn set_status(value: &mut Value, ids: &HashSet<String>, status: OrderStatus, updated_at: &Value) -> bool {
    let Some(orders) = orders_mut(value) else {
        return false;
    };
    let mut changed = false;
    for order in orders.iter_mut() {
        let matched = order_id(order).is_some_and(|id| ids.contains(id));
        if matched {
            if let Some(fields) = order.as_object_mut() {
                fields.insert("status".to_string(), Value::String(status.to_string()));
                fields.insert("updatedAt".to_string(), updated_at.clone());
                changed = true;
            }
        }
    }
    changed
}

/// Puts back the `before` version of each listed order, leaving the rest of
/// `current` as it is.
pub fn revert_orders(current: &mut Value, before: &Value, ids: &HashSet<String>) {
    let Some(previous) = before.get("orders").and_then(Value::as_array) else {
        return;
    };
    let Some(orders) = orders_mut(current) else {
        return;
    };
    for order in orders.iter_mut() {
        let Some(id) = order_id(order).filter(|id| ids.contains(*id)).map(str::to_string) else {
            continue;
        };
        if let Some(original) = previous.iter().find(|candidate| order_id(candidate) == Some(id.as_str())) {
            *order = original.clone();
        }
    }
}

/// Drops the listed orders; true if any were present.
pub fn remove_orders(value: &mut Value, ids: &HashSet<String>) -> bool {
    let Some(orders) = orders_mut(value) else {
        return false;
    };
    let before = orders.len();
    orders.retain(|order| !order_id(order).is_some_and(|id| ids.contains(id)));
    orders.len() != before
}

/// Whether the collection lists an order with this id.
pub fn contains(value: &Value, id: &str) -> bool {
    value.get("orders")
        .and_then(Value::as_array)
        .is_some_and(|orders| orders.iter().any(|order| order_id(order) == Some(id)))
}

/// The cached status of the listed order, if present and readable.
pub fn status_of(value: &Value, id: &str) -> Option<OrderStatus> {
    value.get("orders")
        .and_then(Value::as_array)?
        .iter()
        .find(|order| order_id(order) == Some(id))
        .and_then(|order| order.get("status"))
        .and_then(Value::as_str)
        .and_then(|status| status.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(list: &[&str]) -> HashSet<String> {
        list.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_set_status_touches_only_listed_orders() {
        let mut value = json!({"orders": [
            {"id": "o1", "status": "RECEIVED", "updatedAt": "t0"},
            {"id": "o2", "status": "READY", "updatedAt": "t0"},
        ]});
        assert!(set_status(&mut value, &ids(&["o1"]), OrderStatus::Preparing, &json!("t1")));
        assert_eq!(value["orders"][0], json!({"id": "o1", "status": "PREPARING", "updatedAt": "t1"}));
        assert_eq!(value["orders"][1], json!({"id": "o2", "status": "READY", "updatedAt": "t0"}));
    }

    #[test]
    fn test_unexpected_shape_is_left_alone() {
        let mut detail = json!({"order": {"id": "o1", "status": "RECEIVED"}});
        let original = detail.clone();
        assert!(!set_status(&mut detail, &ids(&["o1"]), OrderStatus::Ready, &json!("t1")));
        assert!(!remove_orders(&mut detail, &ids(&["o1"])));
        revert_orders(&mut detail, &original, &ids(&["o1"]));
        assert_eq!(detail, original);

        let mut wrong = json!({"orders": "not a list"});
        assert!(!set_status(&mut wrong, &ids(&["o1"]), OrderStatus::Ready, &json!("t1")));
    }

    #[test]
    fn test_revert_orders_keeps_other_changes() {
        let before = json!({"orders": [{"id": "o1", "status": "RECEIVED"}, {"id": "o2", "status": "READY"}]});
        let mut current = json!({"orders": [{"id": "o1", "status": "PREPARING"}, {"id": "o2", "status": "SERVED"}]});
        revert_orders(&mut current, &before, &ids(&["o1"]));
        assert_eq!(current, json!({"orders": [{"id": "o1", "status": "RECEIVED"}, {"id": "o2", "status": "SERVED"}]}));
    }

    #[test]
    fn test_remove_and_contains() {
        let mut value = json!({"orders": [{"id": "o1"}, {"id": "o2"}]});
        assert!(contains(&value, "o2"));
        assert!(remove_orders(&mut value, &ids(&["o2"])));
        assert!(!contains(&value, "o2"));
        assert!(!remove_orders(&mut value, &ids(&["o2"])));
    }

    #[test]
    fn test_status_of() {
        let value = json!({"orders": [{"id": "o1", "status": "READY"}, {"id": "o2", "status": "??"}]});
        assert_eq!(status_of(&value, "o1"), Some(OrderStatus::Ready));
        assert_eq!(status_of(&value, "o2"), None);
        assert_eq!(status_of(&value, "o3"), None);
    }
}
