use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type FoodId = i64;

/// A priced extra. Used both for the catalog's `available_addons` and for
/// the snapshot stored on an order item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Addon {
    pub name: String,
    pub price: Decimal,
}

impl Addon {
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }
}

/// Menu entry as supplied by the catalog. Read-only from the order side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Food {
    pub id: FoodId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    #[serde(default)]
    pub available_addons: Vec<Addon>,
}

impl Food {
    /// Looks up an addon definition by its display name.
    pub fn addon(&self, name: &str) -> Option<&Addon> {
        self.available_addons.iter().find(|a| a.name == name)
    }
}
