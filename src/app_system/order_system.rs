use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::actor_framework::{Entity, ResourceActor, ResourceClient};
use crate::board::drag::PointerSensor;
use crate::board::optimistic::Notification;
use crate::board::OrderBoard;
use crate::cache::{CacheClient, CacheService};
use crate::clients::{MenuClient, OrderClient, QrCodeClient};
use crate::domain::{MenuItem, Order, QrCode};
use super::{AppConfig, AppError};

/// The main application system that orchestrates all actors.
///
/// Responsible for starting up the menu, QR code and order services, opening
/// boards on top of them, and shutting everything down in order.
pub struct RestaurantSystem {
    pub order_client: OrderClient,
    pub menu_client: MenuClient,
    pub qr_code_client: QrCodeClient,
    config: AppConfig,
    caches: Vec<CacheClient>,
    pollers: Vec<JoinHandle<()>>,
    handles: Vec<JoinHandle<()>>,
}

fn spawn_resource<T>(buffer_size: usize, prefix: &'static str) -> (ResourceClient<T>, JoinHandle<()>)
where
    T: Entity<Id = String>,
{
    let counter = Arc::new(AtomicU64::new(1));
    let next_id = move || {
        let id = counter.fetch_add(1, Ordering::SeqCst);
        format!("{}_{}", prefix, id)
    };
    let (actor, client) = ResourceActor::<T>::new(buffer_size, next_id);
    (client, tokio::spawn(actor.run()))
}

impl RestaurantSystem {
    pub fn new(config: &AppConfig) -> Self {
        let buffer_size = config.actor_buffer_size;

        // 1. Menu service
        let (menu_resource_client, menu_handle) = spawn_resource::<MenuItem>(buffer_size, "item");
        let menu_client = MenuClient::new(menu_resource_client);

        // 2. Table QR code service
        let (qr_resource_client, qr_handle) = spawn_resource::<QrCode>(buffer_size, "qr");
        let qr_code_client = QrCodeClient::new(qr_resource_client);

        // 3. Order service, which checks tables and prices lines against the other two
        let (order_resource_client, order_handle) = spawn_resource::<Order>(buffer_size, "order");
        let order_client = OrderClient::new(
            order_resource_client,
            menu_client.clone(),
            qr_code_client.clone(),
            config.transition_policy,
        );

        info!(policy = ?config.transition_policy, "Restaurant system started");
        Self {
            order_client,
            menu_client,
            qr_code_client,
            config: config.clone(),
            caches: Vec::new(),
            pollers: Vec::new(),
            handles: vec![menu_handle, qr_handle, order_handle],
        }
    }

    /// Starts a query cache and poller for one restaurant's board.
    pub async fn open_board(
        &mut self,
        restaurant_id: &str,
    ) -> Result<(OrderBoard, mpsc::UnboundedReceiver<Notification>), AppError> {
        let (cache_service, cache) = CacheService::new(self.config.actor_buffer_size);
        self.handles.push(tokio::spawn(cache_service.run()));
        self.caches.push(cache.clone());

        let (board, notifications) = OrderBoard::new(
            restaurant_id,
            cache,
            self.order_client.clone(),
            self.menu_client.clone(),
            PointerSensor::new(self.config.drag_activation_distance),
        );
        let poller = board.spawn_poller(self.config.poll_interval).await?;
        self.pollers.push(poller);

        info!(restaurant_id, "Board opened");
        Ok((board, notifications))
    }

    pub async fn shutdown(self) -> Result<(), AppError> {
        info!("Shutting down system...");

        for poller in &self.pollers {
            poller.abort();
        }
        for cache in &self.caches {
            if let Err(e) = cache.shutdown().await {
                warn!(error = %e, "Cache already stopped");
            }
        }
        if let Err(e) = self.order_client.shutdown().await {
            warn!(error = %e, "Order service already stopped");
        }
        if let Err(e) = self.qr_code_client.shutdown().await {
            warn!(error = %e, "QR code service already stopped");
        }
        if let Err(e) = self.menu_client.shutdown().await {
            warn!(error = %e, "Menu service already stopped");
        }

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(AppError::Shutdown(format!("Actor task failed: {:?}", e)));
            }
        }
        for poller in self.pollers {
            // Aborted pollers report cancellation, which is expected here.
            if let Err(e) = poller.await {
                if !e.is_cancelled() {
                    return Err(AppError::Shutdown(format!("Board poller failed: {:?}", e)));
                }
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
