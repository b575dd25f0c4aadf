use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::food::{Addon, FoodId};
use crate::geocoding::Coordinates;

/// Order status in the delivery lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
    Failed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Failed => "failed",
        }
    }

    /// Delivered, cancelled and failed orders accept no further driver updates.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Failed
        )
    }

    /// Position along the happy path; terminal failure states sort last.
    pub fn rank(&self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Confirmed => 1,
            OrderStatus::Preparing => 2,
            OrderStatus::OutForDelivery => 3,
            OrderStatus::Delivered => 4,
            OrderStatus::Cancelled => 5,
            OrderStatus::Failed => 6,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// A customer's delivery order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub delivery_address: String,
    pub delivery_latitude: Option<f64>,
    pub delivery_longitude: Option<f64>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub delivery_fee: Decimal,
    pub notes: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// New orders always start out pending and unassigned.
    pub fn new(
        user_id: Uuid,
        delivery_address: String,
        coordinates: Option<Coordinates>,
        total_amount: Decimal,
        delivery_fee: Decimal,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            driver_id: None,
            delivery_address,
            delivery_latitude: coordinates.map(|c| c.latitude),
            delivery_longitude: coordinates.map(|c| c.longitude),
            total_amount,
            status: OrderStatus::Pending,
            delivery_fee,
            notes,
            assigned_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_assigned_to(&self, driver_id: Uuid) -> bool {
        self.driver_id == Some(driver_id)
    }

    pub fn is_unassigned(&self) -> bool {
        self.driver_id.is_none()
    }
}

/// A line of an order. Prices are snapshots taken at creation time and are
/// never touched again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub food_id: FoodId,
    pub quantity: i32,
    pub price_at_time_of_order: Decimal,
    pub addons_details: Vec<Addon>,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn new(
        order_id: Uuid,
        food_id: FoodId,
        quantity: i32,
        price_at_time_of_order: Decimal,
        addons_details: Vec<Addon>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            food_id,
            quantity,
            price_at_time_of_order,
            addons_details,
            created_at: Utc::now(),
        }
    }
}

/// Read-model projection of an order. `items` is only populated when the
/// caller asked for them.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<OrderItem>>,
}

impl OrderView {
    pub fn summary(order: Order) -> Self {
        Self { order, items: None }
    }

    pub fn detailed(order: Order, items: Vec<OrderItem>) -> Self {
        Self {
            order,
            items: Some(items),
        }
    }
}
