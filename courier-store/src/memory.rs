//! Process-local stores with the same conditional-write semantics as the
//! Postgres repositories. Used by tests and local runs without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::{
    Food, FoodCatalog, FoodId, Order, OrderItem, OrderRepository, OrderScope, OrderStatus,
    StoreError, StoreResult,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    orders: HashMap<Uuid, Order>,
    items: Vec<OrderItem>,
}

#[derive(Default)]
pub struct InMemoryOrderStore {
    state: Mutex<MemoryState>,
    fail_next_write: AtomicBool,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `create_order` fail without writing anything.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    pub fn order_count(&self) -> usize {
        self.lock().map(|s| s.orders.len()).unwrap_or(0)
    }

    pub fn item_count(&self) -> usize {
        self.lock().map(|s| s.items.len()).unwrap_or(0)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Database("in-memory store lock poisoned".to_string()))
    }

    /// Applies `change` to the order if `matches` holds, all under one lock.
    fn update_if<M, C>(&self, id: Uuid, matches: M, change: C) -> StoreResult<Option<Order>>
    where
        M: FnOnce(&Order) -> bool,
        C: FnOnce(&mut Order),
    {
        let mut state = self.lock()?;
        match state.orders.get_mut(&id) {
            Some(order) if matches(order) => {
                change(order);
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderStore {
    async fn create_order(&self, order: &Order, items: &[OrderItem]) -> StoreResult<()> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Database("simulated write failure".to_string()));
        }

        let mut state = self.lock()?;
        if state.orders.contains_key(&order.id) {
            return Err(StoreError::Database(format!("duplicate order id {}", order.id)));
        }
        state.orders.insert(order.id, order.clone());
        state.items.extend_from_slice(items);
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.lock()?.orders.get(&id).cloned())
    }

    async fn list_orders(&self, scope: OrderScope) -> StoreResult<Vec<Order>> {
        let state = self.lock()?;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|order| scope.includes(order))
            .cloned()
            .collect();
        orders.sort_by(|a, b| scope.compare(a, b));
        Ok(orders)
    }

    async fn list_items(&self, order_ids: &[Uuid]) -> StoreResult<Vec<OrderItem>> {
        let state = self.lock()?;
        Ok(state
            .items
            .iter()
            .filter(|item| order_ids.contains(&item.order_id))
            .cloned()
            .collect())
    }

    async fn claim_unassigned(
        &self,
        id: Uuid,
        driver_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Order>> {
        self.update_if(
            id,
            |order| order.is_unassigned() && !order.status.is_terminal(),
            |order| {
                order.driver_id = Some(driver_id);
                order.assigned_at = Some(at);
                order.status = OrderStatus::OutForDelivery;
                order.updated_at = at;
            },
        )
    }

    async fn confirm_assignment(
        &self,
        id: Uuid,
        driver_id: Uuid,
        expected: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Order>> {
        self.update_if(
            id,
            |order| order.is_assigned_to(driver_id) && order.status == expected,
            |order| {
                order.assigned_at.get_or_insert(at);
                order.status = OrderStatus::OutForDelivery;
                order.updated_at = at;
            },
        )
    }

    async fn transition_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Order>> {
        self.update_if(
            id,
            |order| order.status == expected,
            |order| {
                order.status = to;
                order.updated_at = at;
            },
        )
    }

    async fn ping(&self) -> StoreResult<()> {
        self.lock().map(|_| ())
    }
}

/// Fixed menu held in memory.
#[derive(Default)]
pub struct InMemoryCatalog {
    foods: HashMap<FoodId, Food>,
}

impl InMemoryCatalog {
    pub fn with_foods(foods: Vec<Food>) -> Self {
        Self {
            foods: foods.into_iter().map(|food| (food.id, food)).collect(),
        }
    }
}

#[async_trait]
impl FoodCatalog for InMemoryCatalog {
    async fn get_food(&self, id: FoodId) -> StoreResult<Option<Food>> {
        Ok(self.foods.get(&id).cloned())
    }
}
