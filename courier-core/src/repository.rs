use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use uuid::Uuid;

use crate::food::{Food, FoodId};
use crate::order::{Order, OrderItem, OrderStatus};
use crate::StoreResult;

/// Which slice of the order table a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    /// Every order, newest first.
    All,
    /// Orders owned by one customer, newest first.
    OwnedBy(Uuid),
    /// The unassigned pool plus the driver's own active deliveries.
    /// Unassigned first, then by lifecycle rank, then oldest first.
    DriverQueue(Uuid),
}

impl OrderScope {
    pub fn includes(&self, order: &Order) -> bool {
        match self {
            OrderScope::All => true,
            OrderScope::OwnedBy(user_id) => order.user_id == *user_id,
            OrderScope::DriverQueue(driver_id) => {
                order.is_unassigned()
                    || (order.is_assigned_to(*driver_id)
                        && order.status == OrderStatus::OutForDelivery)
            }
        }
    }

    /// Ordering of a listing for this scope. Backends that sort natively must
    /// agree with this.
    pub fn compare(&self, a: &Order, b: &Order) -> Ordering {
        match self {
            OrderScope::All | OrderScope::OwnedBy(_) => b.created_at.cmp(&a.created_at),
            OrderScope::DriverQueue(_) => a
                .driver_id
                .is_some()
                .cmp(&b.driver_id.is_some())
                .then_with(|| a.status.rank().cmp(&b.status.rank()))
                .then_with(|| a.created_at.cmp(&b.created_at)),
        }
    }
}

/// Transactional persistence for orders and their items.
///
/// The mutating methods other than `create_order` are conditional updates:
/// they return `Ok(None)` when the row no longer matches the expected state,
/// which callers treat as a lost race.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts the order and all of its items atomically.
    async fn create_order(&self, order: &Order, items: &[OrderItem]) -> StoreResult<()>;

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>>;

    async fn list_orders(&self, scope: OrderScope) -> StoreResult<Vec<Order>>;

    /// Items for a batch of orders, in insertion order per order.
    async fn list_items(&self, order_ids: &[Uuid]) -> StoreResult<Vec<OrderItem>>;

    /// Claims an order for `driver_id` only if nobody holds it yet and it is
    /// not in a terminal state. Sets `assigned_at` and moves the order to
    /// `out_for_delivery`.
    async fn claim_unassigned(
        &self,
        id: Uuid,
        driver_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Order>>;

    /// Moves an order already held by `driver_id` from `expected` to
    /// `out_for_delivery`, filling `assigned_at` if it is still empty.
    async fn confirm_assignment(
        &self,
        id: Uuid,
        driver_id: Uuid,
        expected: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Order>>;

    /// Sets the status to `to` if it is still `expected`.
    async fn transition_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Order>>;

    async fn ping(&self) -> StoreResult<()>;
}

/// Read-only view of the menu.
#[async_trait]
pub trait FoodCatalog: Send + Sync {
    async fn get_food(&self, id: FoodId) -> StoreResult<Option<Food>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn order_at(minutes_ago: i64) -> Order {
        let mut order = Order::new(
            Uuid::new_v4(),
            "1 Main St".to_string(),
            None,
            dec!(10.00),
            dec!(0),
            None,
        );
        order.created_at = Utc::now() - Duration::minutes(minutes_ago);
        order
    }

    #[test]
    fn test_driver_queue_membership() {
        let driver = Uuid::new_v4();
        let other = Uuid::new_v4();
        let scope = OrderScope::DriverQueue(driver);

        let pool = order_at(1);
        assert!(scope.includes(&pool));

        let mut mine = order_at(1);
        mine.driver_id = Some(driver);
        mine.status = OrderStatus::OutForDelivery;
        assert!(scope.includes(&mine));

        mine.status = OrderStatus::Delivered;
        assert!(!scope.includes(&mine));

        let mut theirs = order_at(1);
        theirs.driver_id = Some(other);
        theirs.status = OrderStatus::OutForDelivery;
        assert!(!scope.includes(&theirs));
    }

    #[test]
    fn test_driver_queue_ordering() {
        let driver = Uuid::new_v4();
        let scope = OrderScope::DriverQueue(driver);

        let mut assigned = order_at(60);
        assigned.driver_id = Some(driver);
        assigned.status = OrderStatus::OutForDelivery;

        let old_pending = order_at(30);
        let new_pending = order_at(5);
        let mut confirmed = order_at(50);
        confirmed.status = OrderStatus::Confirmed;

        let mut orders = vec![
            assigned.clone(),
            new_pending.clone(),
            confirmed.clone(),
            old_pending.clone(),
        ];
        orders.sort_by(|a, b| scope.compare(a, b));

        let ids: Vec<_> = orders.iter().map(|o| o.id).collect();
        assert_eq!(
            ids,
            vec![old_pending.id, new_pending.id, confirmed.id, assigned.id]
        );
    }

    #[test]
    fn test_owned_scope_newest_first() {
        let older = order_at(10);
        let mut newer = order_at(1);
        newer.user_id = older.user_id;
        let scope = OrderScope::OwnedBy(older.user_id);

        let mut orders = vec![older.clone(), newer.clone()];
        orders.sort_by(|a, b| scope.compare(a, b));
        assert_eq!(orders[0].id, newer.id);
        assert!(!scope.includes(&order_at(1)));
    }
}
