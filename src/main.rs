mod domain;
mod clients;

mod app_system;
mod board;
mod cache;

#[cfg(test)]
mod mock_framework;

mod actor_framework;
mod menu_actor;
mod order_actor;
mod qr_code_actor;

use rust_decimal::Decimal;
use tracing::{error, info, Instrument};
use crate::app_system::{setup_tracing, AppConfig, AppError, RestaurantSystem};
use crate::board::drag::DragEvent;
use crate::board::optimistic::NotificationKind;
use crate::domain::{CustomizationOption, MenuItemCreate, OrderStatus, OrderSubmission, QrCodeCreate, QrCodeQuery, SubmittedItem};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Setup tracing once for the entire application
    setup_tracing();

    let config = AppConfig::from_env()?;
    info!(restaurant_id = %config.restaurant_id, "Starting order board");

    let mut system = RestaurantSystem::new(&config);
    let restaurant_id = config.restaurant_id.clone();

    // Seed a menu item and a table
    let span = tracing::info_span!("seeding");
    let (item_id, qr_code_id) = async {
        let ramen = MenuItemCreate::new(restaurant_id.clone(), "mains", "Tonkotsu Ramen", Decimal::new(1400, 2))
            .with_customization(CustomizationOption::new("extra_egg", "Extra egg", Decimal::new(150, 2)));
        let item_id = system.menu_client.create_menu_item(ramen).await?;
        let qr_code_id = system.qr_code_client
            .create_qr_code(QrCodeCreate::new(restaurant_id.clone(), "T4"))
            .await?;
        Ok::<_, AppError>((item_id, qr_code_id))
    }
    .instrument(span)
    .await?;

    // A customer at table T4 orders two bowls, one with an extra egg
    let submission = OrderSubmission {
        restaurant_id: restaurant_id.clone(),
        qr_code_id: Some(qr_code_id.clone()),
        special_requests: Some("No spring onion".to_string()),
        items: vec![
            SubmittedItem::new(item_id.clone(), 1),
            SubmittedItem::new(item_id.clone(), 1).with_customization("extra_egg"),
        ],
    };
    let span = tracing::info_span!("order_submission");
    let order_id = async {
        info!("Submitting order");
        system.order_client.submit_order(submission).await
    }
    .instrument(span)
    .await?;

    // Open the kitchen board and move the order along
    let (board, mut notifications) = system.open_board(&restaurant_id).await?;
    board.refresh().await?;
    board.refresh_menu().await?;
    for column in board.columns().await? {
        info!(status = %column.status, orders = column.cards.len(), "Board column");
    }

    let span = tracing::info_span!("kitchen", order_id = %order_id);
    async {
        for status in [OrderStatus::Preparing, OrderStatus::Ready] {
            let event = DragEvent::new(order_id.clone(), Some(status.as_str()));
            let outcome = board.handle_drop(&event).await?;
            info!(?outcome, "Drop handled");
        }
        Ok::<_, AppError>(())
    }
    .instrument(span)
    .await?;

    // Closing time: the table stops taking orders and the ramen sells out
    let span = tracing::info_span!("closing");
    async {
        system.qr_code_client.set_active(qr_code_id, false).await?;
        let tables = system.qr_code_client
            .list_qr_codes(QrCodeQuery { restaurant_id: Some(restaurant_id.clone()) })
            .await?;
        let open = tables.iter().filter(|table| table.is_active).count();
        info!(tables = tables.len(), open, "Tables updated");

        let item = system.menu_client.set_availability(item_id, false).await?;
        info!(menu_item = %item.name, available = item.is_available, "Menu item updated");
        Ok::<_, AppError>(())
    }
    .instrument(span)
    .await?;

    while let Ok(notification) = notifications.try_recv() {
        match notification.kind {
            NotificationKind::Success => info!(message = %notification.message, "Notification"),
            NotificationKind::Error => error!(message = %notification.message, "Notification"),
        }
    }

    // Shutdown system gracefully
    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}
