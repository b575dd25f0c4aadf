use async_trait::async_trait;
use courier_core::{Addon, Food, FoodCatalog, FoodId, StoreResult};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::db_error;

/// Reads the `foods` table. The menu is managed elsewhere; nothing here writes.
pub struct StoreFoodCatalog {
    pool: PgPool,
}

impl StoreFoodCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct FoodRow {
    id: i64,
    name: String,
    description: Option<String>,
    price: Decimal,
    category: Option<String>,
    available_addons: Json<Vec<Addon>>,
}

impl From<FoodRow> for Food {
    fn from(row: FoodRow) -> Self {
        Food {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            category: row.category,
            available_addons: row.available_addons.0,
        }
    }
}

#[async_trait]
impl FoodCatalog for StoreFoodCatalog {
    async fn get_food(&self, id: FoodId) -> StoreResult<Option<Food>> {
        let row = sqlx::query_as::<_, FoodRow>(
            "SELECT id, name, description, price, category, available_addons FROM foods WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Food::from))
    }
}
