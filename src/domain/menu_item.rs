use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A dish or drink on a restaurant's menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    pub restaurant_id: String,
    pub category_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub is_available: bool,
    pub customizations: Vec<CustomizationOption>,
}

/// An optional extra a customer can select, priced relative to the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomizationOption {
    pub id: String,
    pub name: String,
    pub price_modifier: Decimal,
}

impl CustomizationOption {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price_modifier: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price_modifier,
        }
    }
}

impl MenuItem {
    pub fn customization(&self, option_id: &str) -> Option<&CustomizationOption> {
        self.customizations.iter().find(|option| option.id == option_id)
    }
}

/// Payload for adding an item to a menu.
#[derive(Debug, Clone)]
pub struct MenuItemCreate {
    pub restaurant_id: String,
    pub category_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub customizations: Vec<CustomizationOption>,
}

impl MenuItemCreate {
    pub fn new(
        restaurant_id: impl Into<String>,
        category_id: impl Into<String>,
        name: impl Into<String>,
        price: Decimal,
    ) -> Self {
        Self {
            restaurant_id: restaurant_id.into(),
            category_id: category_id.into(),
            name: name.into(),
            description: None,
            price,
            customizations: Vec::new(),
        }
    }

    pub fn with_customization(mut self, option: CustomizationOption) -> Self {
        self.customizations.push(option);
        self
    }
}

/// Payload for editing an existing menu item.
#[derive(Debug, Clone, Default)]
pub struct MenuItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct MenuItemQuery {
    pub restaurant_id: Option<String>,
    pub category_id: Option<String>,
    pub available_only: bool,
}
