use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::{
    Addon, Order, OrderItem, OrderRepository, OrderScope, OrderStatus, StoreError, StoreResult,
};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db_error;

const ORDER_COLUMNS: &str = "id, user_id, driver_id, delivery_address, delivery_latitude, \
    delivery_longitude, total_amount, status, delivery_fee, notes, assigned_at, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, order_id, food_id, quantity, price_at_time_of_order, addons_details, created_at";

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    driver_id: Option<Uuid>,
    delivery_address: String,
    delivery_latitude: Option<f64>,
    delivery_longitude: Option<f64>,
    total_amount: Decimal,
    status: String,
    delivery_fee: Decimal,
    notes: Option<String>,
    assigned_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::Corrupt(format!("order {}: {}", row.id, e)))?;

        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            driver_id: row.driver_id,
            delivery_address: row.delivery_address,
            delivery_latitude: row.delivery_latitude,
            delivery_longitude: row.delivery_longitude,
            total_amount: row.total_amount,
            status,
            delivery_fee: row.delivery_fee,
            notes: row.notes,
            assigned_at: row.assigned_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    food_id: i64,
    quantity: i32,
    price_at_time_of_order: Decimal,
    addons_details: Json<Vec<Addon>>,
    created_at: DateTime<Utc>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            food_id: row.food_id,
            quantity: row.quantity,
            price_at_time_of_order: row.price_at_time_of_order,
            addons_details: row.addons_details.0,
            created_at: row.created_at,
        }
    }
}

fn to_order(row: Option<OrderRow>) -> StoreResult<Option<Order>> {
    row.map(Order::try_from).transpose()
}

fn terminal_statuses() -> Vec<String> {
    OrderStatus::ALL
        .iter()
        .filter(|status| status.is_terminal())
        .map(|status| status.as_str().to_string())
        .collect()
}

/// `CASE status ...` expression mapping each status to its lifecycle rank.
fn rank_expression() -> String {
    let arms: String = OrderStatus::ALL
        .iter()
        .map(|status| format!(" WHEN '{}' THEN {}", status.as_str(), status.rank()))
        .collect();
    format!("CASE status{} END", arms)
}

fn list_query(scope: OrderScope) -> String {
    match scope {
        OrderScope::All => format!("SELECT {} FROM orders ORDER BY created_at DESC", ORDER_COLUMNS),
        OrderScope::OwnedBy(_) => format!(
            "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
            ORDER_COLUMNS
        ),
        OrderScope::DriverQueue(_) => format!(
            "SELECT {} FROM orders \
             WHERE driver_id IS NULL OR (driver_id = $1 AND status = '{}') \
             ORDER BY (driver_id IS NOT NULL), {}, created_at ASC",
            ORDER_COLUMNS,
            OrderStatus::OutForDelivery.as_str(),
            rank_expression()
        ),
    }
}

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn create_order(&self, order: &Order, items: &[OrderItem]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, driver_id, delivery_address, delivery_latitude,
                delivery_longitude, total_amount, status, delivery_fee, notes, assigned_at,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.driver_id)
        .bind(&order.delivery_address)
        .bind(order.delivery_latitude)
        .bind(order.delivery_longitude)
        .bind(order.total_amount)
        .bind(order.status.as_str())
        .bind(order.delivery_fee)
        .bind(&order.notes)
        .bind(order.assigned_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        for (line_number, item) in items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, line_number, food_id, quantity,
                    price_at_time_of_order, addons_details, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id)
            .bind(order.id)
            .bind(line_number as i32)
            .bind(item.food_id)
            .bind(item.quantity)
            .bind(item.price_at_time_of_order)
            .bind(Json(&item.addons_details))
            .bind(item.created_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        // Dropping `tx` on any early return above rolls everything back.
        tx.commit().await.map_err(db_error)
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        to_order(row)
    }

    async fn list_orders(&self, scope: OrderScope) -> StoreResult<Vec<Order>> {
        let sql = list_query(scope);
        let query = sqlx::query_as::<_, OrderRow>(&sql);
        let query = match scope {
            OrderScope::All => query,
            OrderScope::OwnedBy(user_id) => query.bind(user_id),
            OrderScope::DriverQueue(driver_id) => query.bind(driver_id),
        };

        query
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }

    async fn list_items(&self, order_ids: &[Uuid]) -> StoreResult<Vec<OrderItem>> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {} FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, line_number",
            ITEM_COLUMNS
        );
        let rows = sqlx::query_as::<_, OrderItemRow>(&sql)
            .bind(order_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    async fn claim_unassigned(
        &self,
        id: Uuid,
        driver_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Order>> {
        // Single statement: of two concurrent claims only one can match
        // `driver_id IS NULL`.
        let sql = format!(
            "UPDATE orders SET driver_id = $2, assigned_at = $3, status = $4, updated_at = $3 \
             WHERE id = $1 AND driver_id IS NULL AND NOT (status = ANY($5)) \
             RETURNING {}",
            ORDER_COLUMNS
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(driver_id)
            .bind(at)
            .bind(OrderStatus::OutForDelivery.as_str())
            .bind(terminal_statuses())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        to_order(row)
    }

    async fn confirm_assignment(
        &self,
        id: Uuid,
        driver_id: Uuid,
        expected: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Order>> {
        let sql = format!(
            "UPDATE orders SET assigned_at = COALESCE(assigned_at, $4), status = $5, updated_at = $4 \
             WHERE id = $1 AND driver_id = $2 AND status = $3 \
             RETURNING {}",
            ORDER_COLUMNS
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(driver_id)
            .bind(expected.as_str())
            .bind(at)
            .bind(OrderStatus::OutForDelivery.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        to_order(row)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Order>> {
        let sql = format!(
            "UPDATE orders SET status = $3, updated_at = $4 \
             WHERE id = $1 AND status = $2 \
             RETURNING {}",
            ORDER_COLUMNS
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(expected.as_str())
            .bind(to.as_str())
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        to_order(row)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(db_error)
    }
}
