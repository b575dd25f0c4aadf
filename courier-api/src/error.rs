use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use courier_order::OrderError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    AuthenticationError(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Order(#[from] OrderError),
}

impl AppError {
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Order(err) => match err {
                OrderError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                // Unknown food or addon on a line: the referenced item does not exist.
                OrderError::InvalidLineItem(_) => (StatusCode::NOT_FOUND, err.to_string()),
                OrderError::NotFound(_) => (StatusCode::NOT_FOUND, "Order not found.".to_string()),
                OrderError::Forbidden(_) => (StatusCode::FORBIDDEN, err.to_string()),
                OrderError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
                OrderError::InvalidTransition { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
                }
                OrderError::Transaction(cause) => {
                    tracing::error!("Internal Server Error: {}", cause);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal Server Error".to_string(),
                    )
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
