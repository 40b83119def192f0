use chrono::Utc;
use rust_decimal::Decimal;
use crate::actor_framework::{Entity, FrameworkError};
use crate::domain::{Order, OrderCreate, OrderQuery, OrderStatus};
use super::actions::OrderAction;

impl Entity for Order {
    type Id = String;
    type CreateParams = OrderCreate;
    // Orders only change through status actions.
    type Patch = ();
    type Query = OrderQuery;
    type Action = OrderAction;
    type ActionResult = Order;

    fn id(&self) -> &String { &self.id }

    /// Creates a new Order together with its line items.
    ///
    /// # Errors
    /// Rejects an empty restaurant, an order without lines, a zero quantity,
    /// a total that does not match its lines, and any initial status other
    /// than RECEIVED (public submission) or DRAFT (administrative creation).
    fn from_create_params(id: String, params: OrderCreate) -> Result<Self, FrameworkError> {
        if params.restaurant_id.is_empty() {
            return Err(FrameworkError::Rejected("Restaurant is required".to_string()));
        }
        if !matches!(params.status, OrderStatus::Received | OrderStatus::Draft) {
            return Err(FrameworkError::Rejected(format!("Orders cannot be created as {}", params.status)));
        }
        if params.items.is_empty() {
            return Err(FrameworkError::Rejected("Order must contain at least one item".to_string()));
        }
        if let Some(item) = params.items.iter().find(|item| item.quantity == 0) {
            return Err(FrameworkError::Rejected(format!("Quantity for {} must be positive", item.menu_item_id)));
        }
        let lines_total: Decimal = params.items.iter().map(|item| item.total_price).sum();
        if lines_total != params.total_amount {
            return Err(FrameworkError::Rejected(format!(
                "Order total {} does not match line items {}",
                params.total_amount, lines_total
            )));
        }

        let now = Utc::now();
        Ok(Self {
            id,
            restaurant_id: params.restaurant_id,
            qr_code_id: params.qr_code_id,
            status: params.status,
            total_amount: params.total_amount,
            submitted_at: now,
            created_at: now,
            updated_at: now,
            special_requests: params.special_requests,
            items: params.items,
        })
    }

    fn matches(&self, query: &OrderQuery) -> bool {
        query.restaurant_id.as_ref().map_or(true, |id| *id == self.restaurant_id)
            && query.status.map_or(true, |status| status == self.status)
    }

    fn on_update(&mut self, _patch: ()) -> Result<(), FrameworkError> {
        Ok(())
    }

    /// Handles order-specific actions.
    ///
    /// # Actions
    /// - `SetStatus`: moves the order along the pipeline and stamps `updated_at`
    fn handle_action(&mut self, action: OrderAction) -> Result<Order, FrameworkError> {
        match action {
            OrderAction::SetStatus { status, policy } => {
                if !policy.allows(self.status, status) {
                    return Err(FrameworkError::Rejected(format!(
                        "Cannot move order {} from {} to {}",
                        self.id, self.status, status
                    )));
                }
                self.status = status;
                self.updated_at = Utc::now();
                Ok(self.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderItem, TransitionPolicy};

    fn line(quantity: u32) -> OrderItem {
        OrderItem::priced("item_1", "Soup", Decimal::new(600, 2), quantity, Vec::new(), None)
    }

    fn create(status: OrderStatus) -> OrderCreate {
        OrderCreate::new("restaurant_1", None, status, vec![line(2)], None)
    }

    #[test]
    fn test_create_received_order() {
        let order = Order::from_create_params("order_1".into(), create(OrderStatus::Received)).unwrap();
        assert_eq!(order.status, OrderStatus::Received);
        assert_eq!(order.total_amount, Decimal::new(1200, 2));
        assert_eq!(order.created_at, order.updated_at);
    }

    #[test]
    fn test_create_rejects_bad_payloads() {
        let mut ready = create(OrderStatus::Received);
        ready.status = OrderStatus::Ready;
        assert!(Order::from_create_params("o".into(), ready).is_err());

        let empty = OrderCreate::new("restaurant_1", None, OrderStatus::Received, Vec::new(), None);
        assert!(Order::from_create_params("o".into(), empty).is_err());

        let zero = OrderCreate::new("restaurant_1", None, OrderStatus::Received, vec![line(0)], None);
        assert!(Order::from_create_params("o".into(), zero).is_err());

        let mut tampered = create(OrderStatus::Received);
        tampered.total_amount = Decimal::ONE;
        assert!(Order::from_create_params("o".into(), tampered).is_err());
    }

    #[test]
    fn test_set_status_respects_policy() {
        let mut order = Order::from_create_params("order_1".into(), create(OrderStatus::Received)).unwrap();
        let before = order.updated_at;

        let served = order.handle_action(OrderAction::SetStatus {
            status: OrderStatus::Served,
            policy: TransitionPolicy::ForwardOnly,
        }).unwrap();
        assert_eq!(served.status, OrderStatus::Served);
        assert!(served.updated_at >= before);

        let back = order.handle_action(OrderAction::SetStatus {
            status: OrderStatus::Received,
            policy: TransitionPolicy::ForwardOnly,
        });
        assert_eq!(
            back,
            Err(FrameworkError::Rejected("Cannot move order order_1 from SERVED to RECEIVED".into()))
        );

        let permissive = order.handle_action(OrderAction::SetStatus {
            status: OrderStatus::Received,
            policy: TransitionPolicy::Permissive,
        }).unwrap();
        assert_eq!(permissive.status, OrderStatus::Received);
    }

    #[test]
    fn test_set_current_status_overwrites() {
        let mut order = Order::from_create_params("order_1".into(), create(OrderStatus::Received)).unwrap();
        let before = order.updated_at;

        for policy in [TransitionPolicy::Permissive, TransitionPolicy::ForwardOnly] {
            let same = order.handle_action(OrderAction::SetStatus { status: OrderStatus::Received, policy }).unwrap();
            assert_eq!(same.status, OrderStatus::Received);
            assert!(same.updated_at >= before);
        }
    }

    #[test]
    fn test_matches_query() {
        let order = Order::from_create_params("order_1".into(), create(OrderStatus::Received)).unwrap();
        assert!(order.matches(&OrderQuery::default()));
        assert!(order.matches(&OrderQuery::for_restaurant("restaurant_1").with_status(OrderStatus::Received)));
        assert!(!order.matches(&OrderQuery::for_restaurant("restaurant_2")));
        assert!(!order.matches(&OrderQuery::for_restaurant("restaurant_1").with_status(OrderStatus::Ready)));
    }
}
