use courier_catalog::{check_amount, LineItemRequest, PricingEngine};
use courier_core::{
    Coordinates, FoodCatalog, Geocoder, Order, OrderItem, OrderRepository, OrderView,
};
use courier_shared::{Caller, Masked};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::assignment::{AssignmentCoordinator, TakeOutcome};
use crate::authorization::{authorize, Action};
use crate::error::OrderError;
use crate::query::{OrderQueryService, Projection};
use crate::status::StatusMachine;

const MAX_ADDRESS_LEN: usize = 255;
const MAX_NOTES_LEN: usize = 1000;
const MAX_QUANTITY: i32 = 1000;

/// Payload for placing an order.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderRequest {
    pub delivery_address: String,
    pub delivery_fee: Option<Decimal>,
    pub notes: Option<String>,
    pub items: Vec<LineItemRequest>,
}

impl NewOrderRequest {
    /// Input checks that run before the catalog or store is touched.
    pub fn validate(&self) -> Result<(), OrderError> {
        let address = self.delivery_address.trim();
        if address.is_empty() {
            return Err(invalid("delivery_address is required"));
        }
        if address.chars().count() > MAX_ADDRESS_LEN {
            return Err(invalid("delivery_address may not exceed 255 characters"));
        }
        if let Some(fee) = self.delivery_fee {
            check_amount("delivery_fee", fee)?;
        }
        if self
            .notes
            .as_ref()
            .is_some_and(|notes| notes.chars().count() > MAX_NOTES_LEN)
        {
            return Err(invalid("notes may not exceed 1000 characters"));
        }
        if self.items.is_empty() {
            return Err(invalid("items must contain at least one entry"));
        }

        for (index, item) in self.items.iter().enumerate() {
            if item.quantity < 1 {
                return Err(invalid(&format!("items.{}.quantity must be at least 1", index)));
            }
            if item.quantity > MAX_QUANTITY {
                return Err(invalid(&format!(
                    "items.{}.quantity may not exceed {}",
                    index, MAX_QUANTITY
                )));
            }
            for addon in &item.addons {
                if addon.name.trim().is_empty() {
                    return Err(invalid(&format!("items.{}.addons_details name is required", index)));
                }
                if let Some(price) = addon.price {
                    check_amount(&format!("items.{}.addons_details price", index), price)?;
                }
            }
        }
        Ok(())
    }
}

fn invalid(message: &str) -> OrderError {
    OrderError::Validation(message.to_string())
}

/// Entry point for the order lifecycle: creation, listing, status updates
/// and driver assignment.
pub struct OrderManager {
    orders: Arc<dyn OrderRepository>,
    catalog: Arc<dyn FoodCatalog>,
    geocoder: Arc<dyn Geocoder>,
    pricing: PricingEngine,
    geocode_timeout: Duration,
    status: StatusMachine,
    assignment: AssignmentCoordinator,
    queries: OrderQueryService,
}

impl OrderManager {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        catalog: Arc<dyn FoodCatalog>,
        geocoder: Arc<dyn Geocoder>,
        pricing: PricingEngine,
        geocode_timeout: Duration,
    ) -> Self {
        Self {
            status: StatusMachine::new(orders.clone()),
            assignment: AssignmentCoordinator::new(orders.clone()),
            queries: OrderQueryService::new(orders.clone()),
            orders,
            catalog,
            geocoder,
            pricing,
            geocode_timeout,
        }
    }

    /// Prices the request, geocodes the address if possible and stores the
    /// order with its items in one transaction.
    pub async fn create_order(
        &self,
        caller: &Caller,
        request: NewOrderRequest,
    ) -> Result<OrderView, OrderError> {
        authorize(caller, Action::CreateOrder)?;
        request.validate()?;

        let quote = self
            .pricing
            .quote(self.catalog.as_ref(), &request.items, request.delivery_fee)
            .await?;

        let address = request.delivery_address.trim().to_string();
        let coordinates = self.locate(&address).await;

        let order = Order::new(
            caller.id,
            address,
            coordinates,
            quote.total,
            quote.delivery_fee,
            request.notes,
        );
        let items: Vec<OrderItem> = quote
            .lines
            .into_iter()
            .map(|line| {
                OrderItem::new(order.id, line.food_id, line.quantity, line.unit_price, line.addons)
            })
            .collect();

        self.orders.create_order(&order, &items).await.map_err(|e| {
            tracing::error!(user_id = %caller.id, "Order creation transaction failed: {}", e);
            OrderError::Transaction(e)
        })?;

        tracing::info!(
            order_id = %order.id,
            user_id = %caller.id,
            total = %order.total_amount,
            lines = items.len(),
            "Order created"
        );
        Ok(OrderView::detailed(order, items))
    }

    pub async fn list_orders(
        &self,
        caller: &Caller,
        projection: Projection,
    ) -> Result<Vec<OrderView>, OrderError> {
        self.queries.list(caller, projection).await
    }

    pub async fn get_order(&self, caller: &Caller, order_id: Uuid) -> Result<OrderView, OrderError> {
        self.queries.get(caller, order_id).await
    }

    pub async fn update_status(
        &self,
        caller: &Caller,
        order_id: Uuid,
        requested: &str,
    ) -> Result<Order, OrderError> {
        self.status.update_status(caller, order_id, requested).await
    }

    pub async fn take_order(
        &self,
        caller: &Caller,
        order_id: Uuid,
    ) -> Result<TakeOutcome, OrderError> {
        self.assignment.take_order(caller, order_id).await
    }

    /// Store liveness, used by the health endpoint.
    pub async fn ping(&self) -> Result<(), OrderError> {
        Ok(self.orders.ping().await?)
    }

    /// Best-effort geocoding. Any failure or timeout yields `None`.
    async fn locate(&self, address: &str) -> Option<Coordinates> {
        let masked = Masked(address);
        match tokio::time::timeout(self.geocode_timeout, self.geocoder.geocode(address)).await {
            Ok(Ok(Some(coordinates))) => Some(coordinates),
            Ok(Ok(None)) => {
                tracing::warn!(address = %masked, "Geocoding returned no results");
                None
            }
            Ok(Err(e)) => {
                tracing::warn!(address = %masked, error = %e, "Geocoding failed, storing order without coordinates");
                None
            }
            Err(_) => {
                tracing::warn!(
                    address = %masked,
                    timeout_ms = self.geocode_timeout.as_millis() as u64,
                    "Geocoding timed out, storing order without coordinates"
                );
                None
            }
        }
    }
}
