//! # Order Board
//!
//! The kitchen's view of a restaurant's orders: five status columns read from
//! the query cache, drag and keyboard moves between them, and a background
//! poller that keeps the cached collections fresh.
//!
//! Cards are read straight from the cached `{"orders": [...]}` collection, so
//! an optimistic write shows up on the next read without waiting for the
//! order service.

mod entries;
mod error;
pub mod drag;
pub mod optimistic;

pub use error::*;

use std::time::Duration;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheClient, CacheEvent, QueryKey};
use crate::clients::{MenuClient, OrderClient};
use crate::domain::{MenuItemQuery, OrderQuery, OrderStatus};
use drag::{BoardKey, DragEvent, Droppable, KeyboardSensor, Point, PointerSensor, Rect};
use optimistic::{MutationOutcome, Notification, OptimisticCoordinator, SkipReason};

/// One order as the board shows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCard {
    pub id: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub total_amount: Decimal,
    #[serde(default)]
    pub qr_code_id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// A status change for this order is still waiting on the service.
    #[serde(skip)]
    pub updating: bool,
}

impl OrderCard {
    pub fn new(id: impl Into<String>, status: OrderStatus) -> Self {
        Self {
            id: id.into(),
            status,
            total_amount: Decimal::ZERO,
            qr_code_id: None,
            updated_at: None,
            updating: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardColumn {
    pub status: OrderStatus,
    pub cards: Vec<OrderCard>,
}

#[derive(Clone)]
pub struct OrderBoard {
    restaurant_id: String,
    cache: CacheClient,
    orders: OrderClient,
    menu: MenuClient,
    coordinator: OptimisticCoordinator,
    pointer: PointerSensor,
    keyboard: KeyboardSensor,
}

impl OrderBoard {
    pub fn new(
        restaurant_id: impl Into<String>,
        cache: CacheClient,
        orders: OrderClient,
        menu: MenuClient,
        pointer: PointerSensor,
    ) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let restaurant_id = restaurant_id.into();
        let (coordinator, notifications) =
            OptimisticCoordinator::new(restaurant_id.clone(), cache.clone(), orders.clone());
        let board = Self {
            restaurant_id,
            cache,
            orders,
            menu,
            coordinator,
            pointer,
            keyboard: KeyboardSensor,
        };
        (board, notifications)
    }

    pub fn restaurant_id(&self) -> &str {
        &self.restaurant_id
    }

    pub fn coordinator(&self) -> &OptimisticCoordinator {
        &self.coordinator
    }

    /// Loads the restaurant's orders into the cache.
    pub async fn refresh(&self) -> Result<(), BoardError> {
        self.refetch(QueryKey::orders(self.restaurant_id.clone())).await
    }

    pub async fn refresh_menu(&self) -> Result<(), BoardError> {
        self.refetch(QueryKey::menu_items(self.restaurant_id.clone())).await
    }

    /// Reloads one cached query from its service.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn refetch(&self, key: QueryKey) -> Result<(), BoardError> {
        let value = match &key {
            QueryKey::Orders { restaurant_id, status } => {
                let query = OrderQuery { restaurant_id: Some(restaurant_id.clone()), status: *status };
                let orders = to_json(&self.orders.list_orders(query).await?)?;
                json!({ "orders": orders })
            }
            QueryKey::Order { order_id } => {
                let order = to_json(&self.orders.get_order(order_id.clone()).await?)?;
                json!({ "order": order })
            }
            QueryKey::MenuItems { restaurant_id } => {
                let query = MenuItemQuery { restaurant_id: Some(restaurant_id.clone()), ..Default::default() };
                let items = to_json(&self.menu.list_menu_items(query).await?)?;
                json!({ "menuItems": items })
            }
        };
        self.cache.set(key, value).await?;
        debug!("Refetched");
        Ok(())
    }

    /// Refetches every stale entry this board owns; returns how many.
    pub async fn refresh_stale(&self) -> Result<usize, BoardError> {
        let stale: Vec<QueryKey> = self.cache.stale_keys().await?
            .into_iter()
            .filter(|key| self.owns(key))
            .collect();
        for key in &stale {
            self.refetch(key.clone()).await?;
        }
        Ok(stale.len())
    }

    fn owns(&self, key: &QueryKey) -> bool {
        match key {
            QueryKey::Order { .. } => true,
            other => other.restaurant_id() == Some(self.restaurant_id.as_str()),
        }
    }

    /// Every order on the board, as currently cached.
    pub async fn cards(&self) -> Result<Vec<OrderCard>, BoardError> {
        let Some(entry) = self.cache.get(QueryKey::orders(self.restaurant_id.clone())).await? else {
            return Ok(Vec::new());
        };
        let listed = entry.value.get("orders").cloned().unwrap_or_else(|| Value::Array(Vec::new()));
        let mut cards: Vec<OrderCard> =
            serde_json::from_value(listed).map_err(|e| BoardError::Shape(e.to_string()))?;
        cards.retain(|card| OrderStatus::board_columns().contains(&card.status));
        for card in cards.iter_mut() {
            card.updating = self.coordinator.is_updating(&card.id);
        }
        Ok(cards)
    }

    pub async fn columns(&self) -> Result<Vec<BoardColumn>, BoardError> {
        let cards = self.cards().await?;
        Ok(OrderStatus::board_columns()
            .iter()
            .map(|status| BoardColumn {
                status: *status,
                cards: cards.iter().filter(|card| card.status == *status).cloned().collect(),
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn handle_drop(&self, event: &DragEvent) -> Result<MutationOutcome, BoardError> {
        let cards = self.cards().await?;
        Ok(self.apply_drop(event, &cards).await)
    }

    /// A pointer release: ignored unless the pointer travelled far enough to
    /// start a drag, otherwise dropped on the closest droppable.
    pub async fn handle_pointer_release(
        &self,
        active_id: &str,
        origin: Point,
        release: Point,
        dragged: &Rect,
        droppables: &[Droppable],
    ) -> Result<MutationOutcome, BoardError> {
        if !self.pointer.is_activated(origin, release) {
            return Ok(MutationOutcome::Skipped(SkipReason::NoOp));
        }
        let over = drag::closest_corners(dragged, droppables).map(|droppable| droppable.id.as_str());
        self.handle_drop(&DragEvent::new(active_id, over)).await
    }

    pub async fn handle_key(&self, order_id: &str, key: BoardKey) -> Result<MutationOutcome, BoardError> {
        let cards = self.cards().await?;
        let Some(card) = cards.iter().find(|card| card.id == order_id) else {
            return Ok(MutationOutcome::Skipped(SkipReason::NotCached(order_id.to_string())));
        };
        let event = self.keyboard.drop_for(card, key);
        Ok(self.apply_drop(&event, &cards).await)
    }

    async fn apply_drop(&self, event: &DragEvent, cards: &[OrderCard]) -> MutationOutcome {
        match drag::resolve_drop(event, cards) {
            Some(change) => self.coordinator.request_status_change(&change.order_id, change.status).await,
            None => {
                debug!(active_id = %event.active_id, over_id = ?event.over_id, "Drop changes nothing");
                MutationOutcome::Skipped(SkipReason::NoOp)
            }
        }
    }

    /// Moves a multi-selection to one status. Orders already there are left out
    /// of the request.
    #[instrument(skip(self))]
    pub async fn move_selected(&self, order_ids: &[String], status: OrderStatus) -> Result<MutationOutcome, BoardError> {
        if order_ids.is_empty() {
            return Ok(MutationOutcome::Skipped(SkipReason::EmptySelection));
        }
        let cards = self.cards().await?;
        let pending: Vec<String> = order_ids.iter()
            .filter(|id| cards.iter().find(|card| card.id == **id).map_or(true, |card| card.status != status))
            .cloned()
            .collect();
        if pending.is_empty() {
            return Ok(MutationOutcome::Skipped(SkipReason::NoOp));
        }
        Ok(self.coordinator.request_bulk_status_change(&pending, status).await)
    }

    /// Polls the order service every `every` and refetches entries as they are
    /// invalidated. Polls are skipped while a status change is in flight so
    /// they cannot overwrite an optimistic value. Ends when the cache does.
    pub async fn spawn_poller(&self, every: Duration) -> Result<JoinHandle<()>, BoardError> {
        let mut events = self.cache.subscribe().await?;
        let board = self.clone();
        Ok(tokio::spawn(async move {
            info!(restaurant_id = %board.restaurant_id, "Board poller starting");
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if board.coordinator.has_in_flight() {
                            debug!("Status change in flight, skipping poll");
                            continue;
                        }
                        if let Err(e) = board.poll().await {
                            warn!(error = %e, "Poll failed");
                        }
                    }
                    event = events.recv() => match event {
                        Ok(CacheEvent::Invalidated(key)) if board.owns(&key) => {
                            if board.coordinator.has_in_flight() {
                                continue;
                            }
                            if let Err(e) = board.refetch(key).await {
                                warn!(error = %e, "Refetch failed");
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            warn!(missed, "Poller lagged behind cache events");
                            if let Err(e) = board.refresh_stale().await {
                                warn!(error = %e, "Refetch failed");
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
            info!("Board poller stopped");
        }))
    }

    async fn poll(&self) -> Result<(), BoardError> {
        self.refresh().await?;
        self.refresh_stale().await?;
        Ok(())
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, BoardError> {
    serde_json::to_value(value).map_err(|e| BoardError::Shape(e.to_string()))
}
