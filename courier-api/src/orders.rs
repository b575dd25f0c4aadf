use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use courier_core::{Order, OrderView};
use courier_order::{NewOrderRequest, Projection};
use courier_shared::Caller;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    #[serde(default)]
    pub include_items: bool,
}

impl ListOrdersQuery {
    fn projection(&self) -> Projection {
        if self.include_items {
            Projection::WithItems
        } else {
            Projection::Summary
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct TakeOrderResponse {
    pub message: &'static str,
    pub order: Order,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route(
            "/orders/{id}",
            get(get_order).put(update_status).patch(update_status),
        )
        .route("/orders/{id}/take", post(take_order))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn path_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    path.map(|Path(id)| id)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    query
        .map(|Query(inner)| inner)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /orders
/// Price, geocode and persist a new order for the caller
pub async fn create_order(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<NewOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderView>), AppError> {
    let request = body(payload)?;
    let view = state.orders.create_order(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /orders
/// Orders visible to the caller; `?include_items=true` attaches line items
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    params: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Result<Json<Vec<OrderView>>, AppError> {
    let query = query_params(params)?;
    let views = state.orders.list_orders(&caller, query.projection()).await?;
    Ok(Json(views))
}

/// GET /orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<OrderView>, AppError> {
    let order_id = path_id(path)?;
    let view = state.orders.get_order(&caller, order_id).await?;
    Ok(Json(view))
}

/// PUT|PATCH /orders/{id}
pub async fn update_status(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Order>, AppError> {
    let order_id = path_id(path)?;
    let request = body(payload)?;
    let order = state
        .orders
        .update_status(&caller, order_id, request.status.trim())
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/take
/// Driver claims an order, or confirms one an admin already assigned to them
pub async fn take_order(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<TakeOrderResponse>, AppError> {
    let order_id = path_id(path)?;
    let outcome = state.orders.take_order(&caller, order_id).await?;
    Ok(Json(TakeOrderResponse {
        message: outcome.message(),
        order: outcome.into_order(),
    }))
}
