//! Turning drag gestures into status changes.
//!
//! A drop names the dragged card and whatever it landed on. The landing id is
//! either a column label or another card's id; landing on a card means "that
//! card's column". Where a card sits inside a column is never persisted.

use crate::domain::OrderStatus;
use super::OrderCard;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    fn corners(&self) -> [Point; 4] {
        let right = self.left + self.width;
        let bottom = self.top + self.height;
        [
            Point::new(self.left, self.top),
            Point::new(right, self.top),
            Point::new(self.left, bottom),
            Point::new(right, bottom),
        ]
    }
}

/// Something a card can be dropped on: a column or another card.
#[derive(Debug, Clone, PartialEq)]
pub struct Droppable {
    pub id: String,
    pub rect: Rect,
}

/// Picks the droppable whose corners are nearest, on average, to the
/// dragged rectangle's corners. Ties go to the earlier droppable; droppables
/// whose distance is not finite are never picked.
pub fn closest_corners<'a>(dragged: &Rect, droppables: &'a [Droppable]) -> Option<&'a Droppable> {
    let dragged_corners = dragged.corners();
    droppables
        .iter()
        .map(|droppable| {
            let total: f64 = droppable.rect.corners()
                .iter()
                .zip(dragged_corners.iter())
                .map(|(a, b)| a.distance_to(b))
                .sum();
            (droppable, total / 4.0)
        })
        // A degenerate rect cannot be the closest.
        .filter(|(_, distance)| distance.is_finite())
        .fold(None, |best: Option<(&Droppable, f64)>, (droppable, distance)| match best {
            Some((_, best_distance)) if best_distance <= distance => best,
            _ => Some((droppable, distance)),
        })
        .map(|(droppable, _)| droppable)
}

/// Starts a drag only after the pointer has travelled past a threshold, so a
/// plain click on a card never moves it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSensor {
    pub activation_distance: f64,
}

impl Default for PointerSensor {
    fn default() -> Self {
        Self { activation_distance: 8.0 }
    }
}

impl PointerSensor {
    pub fn new(activation_distance: f64) -> Self {
        Self { activation_distance }
    }

    pub fn is_activated(&self, origin: Point, current: Point) -> bool {
        origin.distance_to(&current) > self.activation_distance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardKey {
    Left,
    Right,
    Up,
    Down,
}

/// Keyboard equivalent of dragging: arrows move the focused card between
/// neighbouring columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyboardSensor;

impl KeyboardSensor {
    /// The drop this key press amounts to. Up/Down stay in the current column
    /// and moving past either edge lands nowhere; both resolve to no-ops.
    pub fn drop_for(&self, card: &OrderCard, key: BoardKey) -> DragEvent {
        let columns = OrderStatus::board_columns();
        let over = columns.iter().position(|status| *status == card.status).and_then(|index| {
            let target = match key {
                BoardKey::Left => index.checked_sub(1),
                BoardKey::Right => Some(index + 1),
                BoardKey::Up | BoardKey::Down => Some(index),
            };
            target.and_then(|i| columns.get(i)).map(|status| status.to_string())
        });
        DragEvent {
            active_id: card.id.clone(),
            over_id: over,
        }
    }
}

/// A finished drag: the dragged card and what it was released over, if anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragEvent {
    pub active_id: String,
    pub over_id: Option<String>,
}

impl DragEvent {
    pub fn new(active_id: impl Into<String>, over_id: Option<&str>) -> Self {
        Self {
            active_id: active_id.into(),
            over_id: over_id.map(str::to_string),
        }
    }
}

/// An accepted drop, ready for the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub order_id: String,
    pub status: OrderStatus,
}

/// The status a drop lands on, if any.
pub fn resolve_target(over_id: &str, cards: &[OrderCard]) -> Option<OrderStatus> {
    OrderStatus::from_board_label(over_id).or_else(|| {
        cards.iter()
            .find(|card| card.id == over_id)
            .map(|card| card.status)
            .filter(|status| OrderStatus::board_columns().contains(status))
    })
}

/// Resolves a drop against the current cards. `None` means the drop changes
/// nothing: no landing target, an unrecognized target, an unknown dragged
/// card, or the card's own status.
pub fn resolve_drop(event: &DragEvent, cards: &[OrderCard]) -> Option<StatusChange> {
    let over_id = event.over_id.as_deref()?;
    let status = resolve_target(over_id, cards)?;
    let dragged = cards.iter().find(|card| card.id == event.active_id)?;
    if dragged.status == status {
        return None;
    }
    Some(StatusChange {
        order_id: dragged.id.clone(),
        status,
    })
}
