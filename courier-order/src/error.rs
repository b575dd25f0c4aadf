use courier_catalog::PricingError;
use courier_core::StoreError;
use courier_shared::Role;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    InvalidLineItem(String),

    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid status value '{requested}' for {role}")]
    InvalidTransition { role: Role, requested: String },

    #[error("Transaction failed: {0}")]
    Transaction(#[from] StoreError),
}

impl From<PricingError> for OrderError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::Catalog(store) => OrderError::Transaction(store),
            PricingError::AmountOutOfRange(message) => OrderError::Validation(message),
            other => OrderError::InvalidLineItem(other.to_string()),
        }
    }
}
