use courier_core::{OrderItem, OrderRepository, OrderScope, OrderView};
use courier_shared::{Caller, Role};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::authorization::{authorize, can_view, Action};
use crate::error::OrderError;

/// Shape of the orders a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    Summary,
    WithItems,
}

/// Role-scoped read model over the order store. Never writes.
pub struct OrderQueryService {
    orders: Arc<dyn OrderRepository>,
}

impl OrderQueryService {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    pub fn scope_for(caller: &Caller) -> OrderScope {
        match caller.role {
            Role::Admin => OrderScope::All,
            Role::Delivery => OrderScope::DriverQueue(caller.id),
            Role::Customer => OrderScope::OwnedBy(caller.id),
        }
    }

    pub async fn list(
        &self,
        caller: &Caller,
        projection: Projection,
    ) -> Result<Vec<OrderView>, OrderError> {
        authorize(caller, Action::ListOrders)?;

        let orders = self.orders.list_orders(Self::scope_for(caller)).await?;
        if projection == Projection::Summary {
            return Ok(orders.into_iter().map(OrderView::summary).collect());
        }

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let mut items = group_by_order(self.orders.list_items(&ids).await?);

        Ok(orders
            .into_iter()
            .map(|order| {
                let lines = items.remove(&order.id).unwrap_or_default();
                OrderView::detailed(order, lines)
            })
            .collect())
    }

    /// Single order with its items, if the caller may see it.
    pub async fn get(&self, caller: &Caller, order_id: Uuid) -> Result<OrderView, OrderError> {
        authorize(caller, Action::ViewOrder)?;

        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;

        if !can_view(caller, &order) {
            return Err(OrderError::Forbidden(
                "You are not authorized to view this order.".to_string(),
            ));
        }

        let items = self.orders.list_items(&[order_id]).await?;
        Ok(OrderView::detailed(order, items))
    }
}

fn group_by_order(items: Vec<OrderItem>) -> HashMap<Uuid, Vec<OrderItem>> {
    let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        grouped.entry(item.order_id).or_default().push(item);
    }
    grouped
}
