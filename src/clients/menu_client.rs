use tracing::{debug, instrument};
use crate::domain::{MenuItem, MenuItemCreate, MenuItemPatch, MenuItemQuery};
use crate::menu_actor::MenuError;
use crate::actor_framework::ResourceClient;

/// Client for interacting with the MenuItem actor.
#[derive(Clone)]
pub struct MenuClient {
    inner: ResourceClient<MenuItem>,
}

impl_basic_client!(MenuClient, MenuItem, MenuError, menu_item);

impl MenuClient {
    #[instrument(skip(self))]
    pub async fn list_menu_items(&self, query: MenuItemQuery) -> Result<Vec<MenuItem>, MenuError> {
        debug!("Sending request");
        let mut items = self.inner.list(query).await.map_err(MenuError::from)?;
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    #[instrument(skip(self, item), fields(name = %item.name, restaurant_id = %item.restaurant_id))]
    pub async fn create_menu_item(&self, item: MenuItemCreate) -> Result<String, MenuError> {
        debug!("Sending request");
        self.inner.create(item).await.map_err(MenuError::from)
    }

    #[instrument(skip(self))]
    pub async fn update_menu_item(&self, id: String, patch: MenuItemPatch) -> Result<MenuItem, MenuError> {
        debug!("Sending request");
        self.inner.update(id, patch).await.map_err(MenuError::from)
    }

    /// Hides or shows an item on the customer menu.
    #[instrument(skip(self))]
    pub async fn set_availability(&self, id: String, is_available: bool) -> Result<MenuItem, MenuError> {
        let patch = MenuItemPatch { is_available: Some(is_available), ..Default::default() };
        self.update_menu_item(id, patch).await
    }
}
