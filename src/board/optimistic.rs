//! # Optimistic status changes
//!
//! The [`OptimisticCoordinator`] rewrites the cached order collections the
//! moment a status change is requested, sends exactly one request to the order
//! service, and then either keeps the new values (and marks the affected
//! entries stale so they are refetched) or rolls every touched entry back to
//! what it held just before the write.
//!
//! Nothing fails out of here: every attempt ends in a [`MutationOutcome`] and,
//! when a request was sent, exactly one [`Notification`].

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::cache::{CacheClient, OptimisticError, QueryKey};
use crate::clients::OrderClient;
use crate::domain::OrderStatus;
use crate::order_actor::OrderError;
use super::entries;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// A user-facing message about a finished mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: NotificationKind::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: NotificationKind::Error, message: message.into() }
    }
}

/// Why a request never reached the order service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    EmptySelection,
    /// The change would leave every order as it is.
    NoOp,
    /// The order is not in any cached collection for this restaurant.
    NotCached(String),
    /// A previous change to this order has not settled yet.
    AlreadyUpdating(String),
    CacheUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The service accepted the change; the optimistic values stand.
    Confirmed,
    /// The service refused the change; the cache is back to its prior values.
    RolledBack,
    Skipped(SkipReason),
}

type InFlightSet = Arc<Mutex<HashSet<String>>>;

/// Marks orders as updating until dropped.
struct InFlightGuard {
    ids: Vec<String>,
    set: InFlightSet,
}

impl InFlightGuard {
    /// Claims every id, or none of them if any is already claimed.
    fn acquire(set: &InFlightSet, ids: &[String]) -> Result<Self, String> {
        let mut claimed = set.lock();
        if let Some(busy) = ids.iter().find(|id| claimed.contains(*id)) {
            return Err(busy.clone());
        }
        claimed.extend(ids.iter().cloned());
        Ok(Self { ids: ids.to_vec(), set: Arc::clone(set) })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut claimed = self.set.lock();
        for id in &self.ids {
            claimed.remove(id);
        }
    }
}

#[derive(Clone)]
pub struct OptimisticCoordinator {
    restaurant_id: String,
    cache: CacheClient,
    orders: OrderClient,
    notifications: mpsc::UnboundedSender<Notification>,
    in_flight: InFlightSet,
}

impl OptimisticCoordinator {
    pub fn new(
        restaurant_id: impl Into<String>,
        cache: CacheClient,
        orders: OrderClient,
    ) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (notifications, receiver) = mpsc::unbounded_channel();
        let coordinator = Self {
            restaurant_id: restaurant_id.into(),
            cache,
            orders,
            notifications,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        };
        (coordinator, receiver)
    }

    pub fn is_updating(&self, order_id: &str) -> bool {
        self.in_flight.lock().contains(order_id)
    }

    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.lock().is_empty()
    }

    #[instrument(skip(self), fields(restaurant_id = %self.restaurant_id))]
    pub async fn request_status_change(&self, order_id: &str, status: OrderStatus) -> MutationOutcome {
        let ids = vec![order_id.to_string()];
        let guard = match InFlightGuard::acquire(&self.in_flight, &ids) {
            Ok(guard) => guard,
            Err(busy) => {
                debug!("Order is already updating");
                return MutationOutcome::Skipped(SkipReason::AlreadyUpdating(busy));
            }
        };
        match self.cached_statuses(&ids).await {
            Ok(cached) if cached.iter().all(|current| *current == Some(status)) => {
                return MutationOutcome::Skipped(SkipReason::NoOp);
            }
            Ok(_) => {}
            Err(reason) => return MutationOutcome::Skipped(reason),
        }

        let request = self.orders.update_status(order_id.to_string(), status);
        let result = self.optimistically(&ids, status, request).await;
        // Settled either way; refetches triggered from here may run.
        drop(guard);
        match result {
            Ok(order) => {
                info!(order_id, status = %order.status, "Status change confirmed");
                self.notify(Notification::success(format!("Order status updated to {}", status)));
                self.invalidate(&ids).await;
                MutationOutcome::Confirmed
            }
            Err(OptimisticError::Cache(e)) => {
                warn!(error = %e, "Cache unavailable, status change not sent");
                MutationOutcome::Skipped(SkipReason::CacheUnavailable)
            }
            Err(OptimisticError::Request(e)) => {
                error!(error = %e, "Status change failed, rolled back");
                self.discard_missing(&e).await;
                self.notify(Notification::error(format!("Failed to update order status: {}", e)));
                MutationOutcome::RolledBack
            }
        }
    }

    /// Moves every listed order to `status` in one all-or-nothing request.
    #[instrument(skip(self), fields(restaurant_id = %self.restaurant_id))]
    pub async fn request_bulk_status_change(&self, order_ids: &[String], status: OrderStatus) -> MutationOutcome {
        let mut seen = HashSet::new();
        let ids: Vec<String> = order_ids.iter().filter(|id| seen.insert(id.as_str())).cloned().collect();
        if ids.is_empty() {
            return MutationOutcome::Skipped(SkipReason::EmptySelection);
        }
        let guard = match InFlightGuard::acquire(&self.in_flight, &ids) {
            Ok(guard) => guard,
            Err(busy) => return MutationOutcome::Skipped(SkipReason::AlreadyUpdating(busy)),
        };
        match self.cached_statuses(&ids).await {
            Ok(cached) if cached.iter().all(|current| *current == Some(status)) => {
                return MutationOutcome::Skipped(SkipReason::NoOp);
            }
            Ok(_) => {}
            Err(reason) => return MutationOutcome::Skipped(reason),
        }

        let request = self.orders.bulk_update_status(ids.clone(), status);
        let result = self.optimistically(&ids, status, request).await;
        drop(guard);
        match result {
            Ok(updated) => {
                info!(updated, status = %status, "Bulk status change confirmed");
                self.notify(Notification::success(format!("{} orders updated to {}", updated, status)));
                self.invalidate(&ids).await;
                MutationOutcome::Confirmed
            }
            Err(OptimisticError::Cache(e)) => {
                warn!(error = %e, "Cache unavailable, bulk status change not sent");
                MutationOutcome::Skipped(SkipReason::CacheUnavailable)
            }
            Err(OptimisticError::Request(e)) => {
                error!(error = %e, orders = ids.len(), "Bulk status change failed, rolled back");
                self.discard_missing(&e).await;
                self.notify(Notification::error(format!("Failed to update orders: {}", e)));
                MutationOutcome::RolledBack
            }
        }
    }

    /// The cached status of each order, in order. Fails if any order is in
    /// no cached collection.
    async fn cached_statuses(&self, ids: &[String]) -> Result<Vec<Option<OrderStatus>>, SkipReason> {
        let restaurant_id = self.restaurant_id.clone();
        let collections = self.cache
            .entries(move |key| key.is_orders_of(&restaurant_id))
            .await
            .map_err(|_| SkipReason::CacheUnavailable)?;

        ids.iter()
            .map(|id| {
                let holders: Vec<&Value> = collections.iter()
                    .map(|(_, value)| value)
                    .filter(|value| entries::contains(value, id))
                    .collect();
                match holders.first() {
                    Some(value) => Ok(entries::status_of(value, id)),
                    None => Err(SkipReason::NotCached(id.clone())),
                }
            })
            .collect()
    }

    async fn optimistically<T, Fut>(
        &self,
        ids: &[String],
        status: OrderStatus,
        request: Fut,
    ) -> Result<T, OptimisticError<OrderError>>
    where
        Fut: Future<Output = Result<T, OrderError>>,
    {
        let restaurant_id = self.restaurant_id.clone();
        let targets: HashSet<String> = ids.iter().cloned().collect();
        let reverted = targets.clone();
        let updated_at = Value::String(Utc::now().to_rfc3339());

        self.cache.with_optimistic_update(
            move |key| key.is_orders_of(&restaurant_id),
            move |value| entries::set_status(value, &targets, status, &updated_at),
            move |current, before| entries::revert_orders(current, before, &reverted),
            request,
        ).await
    }

    /// Marks the restaurant's collections and the orders' detail entries stale.
    async fn invalidate(&self, ids: &[String]) {
        let restaurant_id = self.restaurant_id.clone();
        let details: HashSet<String> = ids.iter().cloned().collect();
        let result = self.cache.invalidate(move |key| match key {
            QueryKey::Order { order_id } => details.contains(order_id),
            other => other.is_orders_of(&restaurant_id),
        }).await;
        if let Err(e) = result {
            warn!(error = %e, "Could not invalidate cached orders");
        }
    }

    /// An order the service no longer knows is dropped from the cache.
    async fn discard_missing(&self, error: &OrderError) {
        let OrderError::NotFound(order_id) = error else {
            return;
        };
        info!(order_id = %order_id, "Discarding order unknown to the service");
        let restaurant_id = self.restaurant_id.clone();
        let gone: HashSet<String> = [order_id.clone()].into_iter().collect();
        if let Err(e) = self.cache
            .update_where(move |key| key.is_orders_of(&restaurant_id), move |value| entries::remove_orders(value, &gone))
            .await
        {
            warn!(error = %e, "Could not discard missing order");
        }
        self.invalidate(&[order_id.clone()]).await;
    }

    fn notify(&self, notification: Notification) {
        // Nobody listening is fine.
        let _ = self.notifications.send(notification);
    }
}
