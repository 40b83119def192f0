use std::collections::HashSet;
use crate::actor_framework::{Entity, FrameworkError};
use crate::domain::{MenuItem, MenuItemCreate, MenuItemPatch, MenuItemQuery};

fn validate_price(price: rust_decimal::Decimal) -> Result<(), FrameworkError> {
    if price.is_sign_negative() {
        return Err(FrameworkError::Rejected(format!("Price cannot be negative: {}", price)));
    }
    Ok(())
}

impl Entity for MenuItem {
    type Id = String;
    type CreateParams = MenuItemCreate;
    type Patch = MenuItemPatch;
    type Query = MenuItemQuery;
    type Action = ();
    type ActionResult = ();

    fn id(&self) -> &String { &self.id }

    /// Creates a new, available MenuItem.
    ///
    /// # Errors
    /// Rejects an empty name, a negative price and duplicate customization ids.
    fn from_create_params(id: String, params: MenuItemCreate) -> Result<Self, FrameworkError> {
        if params.name.trim().is_empty() {
            return Err(FrameworkError::Rejected("Name is required".to_string()));
        }
        validate_price(params.price)?;
        let mut option_ids = HashSet::new();
        if let Some(duplicate) = params.customizations.iter().find(|option| !option_ids.insert(&option.id)) {
            return Err(FrameworkError::Rejected(format!("Duplicate customization: {}", duplicate.id)));
        }

        Ok(Self {
            id,
            restaurant_id: params.restaurant_id,
            category_id: params.category_id,
            name: params.name,
            description: params.description,
            price: params.price,
            is_available: true,
            customizations: params.customizations,
        })
    }

    fn matches(&self, query: &MenuItemQuery) -> bool {
        query.restaurant_id.as_ref().map_or(true, |id| *id == self.restaurant_id)
            && query.category_id.as_ref().map_or(true, |id| *id == self.category_id)
            && (!query.available_only || self.is_available)
    }

    fn on_update(&mut self, patch: MenuItemPatch) -> Result<(), FrameworkError> {
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(FrameworkError::Rejected("Name is required".to_string()));
            }
            self.name = name;
        }
        if let Some(price) = patch.price {
            validate_price(price)?;
            self.price = price;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(is_available) = patch.is_available {
            self.is_available = is_available;
        }
        Ok(())
    }

    fn handle_action(&mut self, _action: ()) -> Result<(), FrameworkError> {
        Ok(())
    }
}
