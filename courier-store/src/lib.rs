pub mod app_config;
pub mod catalog_repo;
pub mod database;
pub mod geocoder;
pub mod memory;
pub mod order_repo;
pub mod resiliency;

pub use catalog_repo::StoreFoodCatalog;
pub use database::DbClient;
pub use geocoder::{build_geocoder, GoogleGeocoder};
pub use order_repo::StoreOrderRepository;

use courier_core::StoreError;

pub(crate) fn db_error(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}
