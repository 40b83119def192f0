use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use super::OrderStatus;

/// A customer's submitted set of menu selections for one restaurant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub restaurant_id: String,
    pub qr_code_id: Option<String>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub submitted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub special_requests: Option<String>,
    pub items: Vec<OrderItem>,
}

/// One line of an order. Prices are captured at submission and never change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub menu_item_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub special_instructions: Option<String>,
    pub customizations: Vec<OrderItemCustomization>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemCustomization {
    pub option_id: String,
    pub name: String,
    pub price_modifier: Decimal,
}

impl OrderItem {
    /// Builds a priced line: the unit price is the base price plus every modifier.
    pub fn priced(
        menu_item_id: impl Into<String>,
        name: impl Into<String>,
        base_price: Decimal,
        quantity: u32,
        customizations: Vec<OrderItemCustomization>,
        special_instructions: Option<String>,
    ) -> Self {
        let unit_price = base_price + customizations.iter().map(|c| c.price_modifier).sum::<Decimal>();
        Self {
            menu_item_id: menu_item_id.into(),
            name: name.into(),
            quantity,
            unit_price,
            total_price: unit_price * Decimal::from(quantity),
            special_instructions,
            customizations,
        }
    }
}

/// Parameters for creating an order together with its line items.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub restaurant_id: String,
    pub qr_code_id: Option<String>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub special_requests: Option<String>,
    pub items: Vec<OrderItem>,
}

impl OrderCreate {
    /// Totals the lines and fills in `total_amount`.
    pub fn new(
        restaurant_id: impl Into<String>,
        qr_code_id: Option<String>,
        status: OrderStatus,
        items: Vec<OrderItem>,
        special_requests: Option<String>,
    ) -> Self {
        let total_amount = items.iter().map(|item| item.total_price).sum();
        Self {
            restaurant_id: restaurant_id.into(),
            qr_code_id,
            status,
            total_amount,
            special_requests,
            items,
        }
    }
}

/// Filter for listing orders.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub restaurant_id: Option<String>,
    pub status: Option<OrderStatus>,
}

impl OrderQuery {
    pub fn for_restaurant(restaurant_id: impl Into<String>) -> Self {
        Self {
            restaurant_id: Some(restaurant_id.into()),
            status: None,
        }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// What a customer sends after scanning a table's QR code.
#[derive(Debug, Clone)]
pub struct OrderSubmission {
    pub restaurant_id: String,
    pub qr_code_id: Option<String>,
    pub special_requests: Option<String>,
    pub items: Vec<SubmittedItem>,
}

#[derive(Debug, Clone)]
pub struct SubmittedItem {
    pub menu_item_id: String,
    pub quantity: u32,
    pub special_instructions: Option<String>,
    /// Ids of the customization options chosen for this line.
    pub customization_ids: Vec<String>,
}

impl SubmittedItem {
    pub fn new(menu_item_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            menu_item_id: menu_item_id.into(),
            quantity,
            special_instructions: None,
            customization_ids: Vec::new(),
        }
    }

    pub fn with_customization(mut self, option_id: impl Into<String>) -> Self {
        self.customization_ids.push(option_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priced_item_includes_modifiers() {
        let extra_cheese = OrderItemCustomization {
            option_id: "opt_cheese".into(),
            name: "Extra cheese".into(),
            price_modifier: Decimal::new(150, 2),
        };
        let item = OrderItem::priced("item_1", "Burger", Decimal::new(1000, 2), 3, vec![extra_cheese], None);
        assert_eq!(item.unit_price, Decimal::new(1150, 2));
        assert_eq!(item.total_price, Decimal::new(3450, 2));
    }

    #[test]
    fn test_order_serializes_camel_case() {
        let now = Utc::now();
        let order = Order {
            id: "order_1".into(),
            restaurant_id: "restaurant_1".into(),
            qr_code_id: Some("qr_1".into()),
            status: OrderStatus::Received,
            total_amount: Decimal::new(1250, 2),
            submitted_at: now,
            created_at: now,
            updated_at: now,
            special_requests: None,
            items: Vec::new(),
        };
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "RECEIVED");
        assert_eq!(json["restaurantId"], "restaurant_1");
        assert_eq!(json["qrCodeId"], "qr_1");
        assert_eq!(json["totalAmount"], "12.50");
        assert!(json.get("updatedAt").is_some());

        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }
}
