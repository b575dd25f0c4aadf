pub mod food;
pub mod geocoding;
pub mod order;
pub mod repository;

pub use food::{Addon, Food, FoodId};
pub use geocoding::{Coordinates, DisabledGeocoder, GeocodeError, Geocoder};
pub use order::{Order, OrderItem, OrderStatus, OrderView, UnknownStatus};
pub use repository::{FoodCatalog, OrderRepository, OrderScope};

/// Failures raised by a persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
