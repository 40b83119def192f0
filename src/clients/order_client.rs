use tracing::{debug, error, info, instrument};
use crate::domain::{
    MenuItem, Order, OrderCreate, OrderItem, OrderItemCustomization, OrderQuery, OrderStatus,
    OrderSubmission, SubmittedItem, TransitionPolicy,
};
use crate::order_actor::{OrderAction, OrderError};
use crate::actor_framework::ResourceClient;
use crate::clients::{MenuClient, QrCodeClient};

/// Client for interacting with the Order actor.
///
/// Public submissions are orchestrated here: the table and every menu item
/// are validated and priced before the order is created in one request.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
    menu_client: MenuClient,
    qr_code_client: QrCodeClient,
    policy: TransitionPolicy,
}

impl OrderClient {
    pub fn new(
        inner: ResourceClient<Order>,
        menu_client: MenuClient,
        qr_code_client: QrCodeClient,
        policy: TransitionPolicy,
    ) -> Self {
        Self {
            inner,
            menu_client,
            qr_code_client,
            policy,
        }
    }

    #[instrument(skip(self, submission), fields(restaurant_id = %submission.restaurant_id, lines = submission.items.len()))]
    pub async fn submit_order(&self, submission: OrderSubmission) -> Result<String, OrderError> {
        info!("Processing submit_order request");

        // Step 1: Validate shape
        if submission.restaurant_id.is_empty() {
            return Err(OrderError::ValidationError("Restaurant is required".to_string()));
        }
        if submission.items.is_empty() {
            return Err(OrderError::ValidationError("Order must contain at least one item".to_string()));
        }
        if let Some(line) = submission.items.iter().find(|line| line.quantity == 0) {
            return Err(OrderError::ValidationError(format!("Quantity for {} must be positive", line.menu_item_id)));
        }

        // Step 2: Validate table
        if let Some(qr_code_id) = &submission.qr_code_id {
            self.validate_table(&submission.restaurant_id, qr_code_id).await?;
        }

        // Step 3: Price every line from the current menu
        let mut items = Vec::with_capacity(submission.items.len());
        for line in submission.items {
            let menu_item = self.load_menu_item(&submission.restaurant_id, &line.menu_item_id).await?;
            items.push(price_line(&menu_item, line)?);
        }

        // Step 4: Create the order with its lines
        let params = OrderCreate::new(
            submission.restaurant_id,
            submission.qr_code_id,
            OrderStatus::Received,
            items,
            submission.special_requests,
        );
        let order_id = self.inner.create(params).await.map_err(OrderError::from)?;
        info!(order_id = %order_id, "Order submitted successfully");
        Ok(order_id)
    }

    /// Administrative creation; the order stays out of the board until it is moved on.
    #[instrument(skip(self, params), fields(restaurant_id = %params.restaurant_id))]
    pub async fn create_draft_order(&self, mut params: OrderCreate) -> Result<String, OrderError> {
        debug!("Sending request");
        params.status = OrderStatus::Draft;
        self.inner.create(params).await.map_err(OrderError::from)
    }

    /// Orders matching `query`, oldest submission first.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>, OrderError> {
        debug!("Sending request");
        let mut orders = self.inner.list(query).await.map_err(OrderError::from)?;
        orders.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then_with(|| a.id.cmp(&b.id)));
        Ok(orders)
    }

    #[instrument(skip(self))]
    pub async fn update_status(&self, id: String, status: OrderStatus) -> Result<Order, OrderError> {
        debug!("Sending request");
        let action = OrderAction::SetStatus { status, policy: self.policy };
        self.inner.perform_action(id, action).await.map_err(OrderError::from)
    }

    /// Moves every order in `ids` to `status`; returns how many were updated.
    #[instrument(skip(self))]
    pub async fn bulk_update_status(&self, ids: Vec<String>, status: OrderStatus) -> Result<usize, OrderError> {
        debug!("Sending request");
        let action = OrderAction::SetStatus { status, policy: self.policy };
        let updated = self.inner.perform_bulk_action(ids, action).await.map_err(OrderError::from)?;
        Ok(updated.len())
    }

    async fn validate_table(&self, restaurant_id: &str, qr_code_id: &str) -> Result<(), OrderError> {
        match self.qr_code_client.get_qr_code(qr_code_id.to_string()).await {
            Ok(Some(qr_code)) if qr_code.restaurant_id != restaurant_id => {
                error!(qr_code_id, "QR code belongs to another restaurant");
                Err(OrderError::InvalidTable(qr_code_id.to_string()))
            }
            Ok(Some(qr_code)) if !qr_code.is_active => {
                error!(qr_code_id, "QR code is deactivated");
                Err(OrderError::InvalidTable(format!("{} is not active", qr_code_id)))
            }
            Ok(Some(qr_code)) => {
                info!(table_number = %qr_code.table_number, "Table validation successful");
                Ok(())
            }
            Ok(None) => {
                error!(qr_code_id, "QR code not found");
                Err(OrderError::InvalidTable(qr_code_id.to_string()))
            }
            Err(e) => {
                error!(error = %e, "Table validation failed");
                Err(OrderError::InvalidTable(format!("Table validation failed: {}", e)))
            }
        }
    }

    async fn load_menu_item(&self, restaurant_id: &str, menu_item_id: &str) -> Result<MenuItem, OrderError> {
        match self.menu_client.get_menu_item(menu_item_id.to_string()).await {
            Ok(Some(item)) if item.restaurant_id != restaurant_id => {
                error!(menu_item_id, "Menu item belongs to another restaurant");
                Err(OrderError::InvalidMenuItem(menu_item_id.to_string()))
            }
            Ok(Some(item)) if !item.is_available => {
                error!(menu_item_id, "Menu item is unavailable");
                Err(OrderError::InvalidMenuItem(format!("{} is unavailable", item.name)))
            }
            Ok(Some(item)) => {
                debug!(menu_item = %item.name, "Menu item validation successful");
                Ok(item)
            }
            Ok(None) => {
                error!(menu_item_id, "Menu item not found");
                Err(OrderError::InvalidMenuItem(menu_item_id.to_string()))
            }
            Err(e) => {
                error!(error = %e, "Menu item validation failed");
                Err(OrderError::InvalidMenuItem(format!("Menu item validation failed: {}", e)))
            }
        }
    }
}

fn price_line(menu_item: &MenuItem, line: SubmittedItem) -> Result<OrderItem, OrderError> {
    let mut customizations = Vec::with_capacity(line.customization_ids.len());
    for option_id in &line.customization_ids {
        let option = menu_item.customization(option_id).ok_or_else(|| {
            OrderError::ValidationError(format!("{} is not an option for {}", option_id, menu_item.name))
        })?;
        customizations.push(OrderItemCustomization {
            option_id: option.id.clone(),
            name: option.name.clone(),
            price_modifier: option.price_modifier,
        });
    }
    Ok(OrderItem::priced(
        menu_item.id.clone(),
        menu_item.name.clone(),
        menu_item.price,
        line.quantity,
        customizations,
        line.special_instructions,
    ))
}

impl_client_methods!(OrderClient, Order, OrderError, order);
