use courier_core::{Addon, Food, FoodCatalog, FoodId, StoreError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where addon prices come from when an order is priced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AddonPriceSource {
    /// Match addons by name against the food's `available_addons` and charge
    /// the catalog price.
    #[default]
    Catalog,
    /// Charge whatever price the client sent.
    Request,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default)]
    pub addon_price_source: AddonPriceSource,
}

/// An addon chosen by the client for one line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddonSelection {
    pub name: String,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItemRequest {
    pub food_id: FoodId,
    pub quantity: i32,
    #[serde(default, alias = "addons_details")]
    pub addons: Vec<AddonSelection>,
}

/// One priced line, carrying the snapshots stored on the order item.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PricedLine {
    pub food_id: FoodId,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub addons: Vec<Addon>,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceQuote {
    pub lines: Vec<PricedLine>,
    pub delivery_fee: Decimal,
    pub total: Decimal,
}

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("Invalid food item: {0}")]
    UnknownFood(FoodId),
    #[error("Invalid addon '{name}' for food item {food_id}")]
    UnknownAddon { food_id: FoodId, name: String },
    #[error("{0}")]
    AmountOutOfRange(String),
    #[error("Catalog lookup failed: {0}")]
    Catalog(#[from] StoreError),
}

/// Decimal places every stored amount carries.
pub const MONEY_SCALE: u32 = 2;

/// Largest unit price, addon price or delivery fee (`NUMERIC(10,2)`).
pub fn max_price() -> Decimal {
    Decimal::new(9_999_999_999, MONEY_SCALE)
}

/// Largest order total (`NUMERIC(12,2)`).
pub fn max_total() -> Decimal {
    Decimal::new(999_999_999_999, MONEY_SCALE)
}

/// Accepts amounts in `0..=max_price()` with at most two decimal places.
/// Trailing zeros do not count towards the scale, so `2.000` is fine.
pub fn check_amount(field: &str, amount: Decimal) -> Result<(), PricingError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(PricingError::AmountOutOfRange(format!(
            "{} must be at least 0",
            field
        )));
    }
    if amount > max_price() {
        return Err(PricingError::AmountOutOfRange(format!(
            "{} may not exceed {}",
            field,
            max_price()
        )));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(PricingError::AmountOutOfRange(format!(
            "{} may not have more than {} decimal places",
            field, MONEY_SCALE
        )));
    }
    Ok(())
}

fn too_large() -> PricingError {
    PricingError::AmountOutOfRange(format!("order total may not exceed {}", max_total()))
}

/// Computes order totals in fixed-point decimal.
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn addon_price_source(&self) -> AddonPriceSource {
        self.config.addon_price_source
    }

    /// Prices every line against the catalog and adds the delivery fee.
    /// Fails on the first unknown food or addon; nothing is written here.
    pub async fn quote(
        &self,
        catalog: &dyn FoodCatalog,
        lines: &[LineItemRequest],
        delivery_fee: Option<Decimal>,
    ) -> Result<PriceQuote, PricingError> {
        let mut priced = Vec::with_capacity(lines.len());
        for line in lines {
            let food = catalog
                .get_food(line.food_id)
                .await?
                .ok_or(PricingError::UnknownFood(line.food_id))?;
            priced.push(self.price_line(&food, line)?);
        }

        let delivery_fee = delivery_fee.unwrap_or(Decimal::ZERO);
        check_amount("delivery_fee", delivery_fee)?;

        let total = priced
            .iter()
            .try_fold(delivery_fee, |sum, line| sum.checked_add(line.subtotal))
            .filter(|total| *total <= max_total())
            .ok_or_else(too_large)?;

        Ok(PriceQuote {
            lines: priced,
            delivery_fee,
            total,
        })
    }

    /// `unit_price * quantity + sum(addon.price * quantity)`, failing instead
    /// of overflowing.
    pub fn price_line(
        &self,
        food: &Food,
        line: &LineItemRequest,
    ) -> Result<PricedLine, PricingError> {
        let quantity = Decimal::from(line.quantity);
        let addons = self.resolve_addons(food, &line.addons)?;

        let subtotal = food
            .price
            .checked_mul(quantity)
            .and_then(|base| {
                addons.iter().try_fold(base, |sum, addon| {
                    sum.checked_add(addon.price.checked_mul(quantity)?)
                })
            })
            .filter(|subtotal| *subtotal <= max_total())
            .ok_or_else(too_large)?;

        Ok(PricedLine {
            food_id: food.id,
            quantity: line.quantity,
            unit_price: food.price,
            addons,
            subtotal,
        })
    }

    fn resolve_addons(
        &self,
        food: &Food,
        selections: &[AddonSelection],
    ) -> Result<Vec<Addon>, PricingError> {
        selections
            .iter()
            .map(|selection| -> Result<Addon, PricingError> {
                match self.config.addon_price_source {
                    AddonPriceSource::Catalog => {
                        let known = food.addon(&selection.name).ok_or_else(|| {
                            PricingError::UnknownAddon {
                                food_id: food.id,
                                name: selection.name.clone(),
                            }
                        })?;
                        if let Some(sent) = selection.price {
                            if sent != known.price {
                                tracing::debug!(
                                    food_id = food.id,
                                    addon = %known.name,
                                    sent = %sent,
                                    catalog = %known.price,
                                    "Ignoring client addon price in favour of catalog price"
                                );
                            }
                        }
                        Ok(known.clone())
                    }
                    AddonPriceSource::Request => {
                        let price = selection.price.unwrap_or(Decimal::ZERO);
                        check_amount("addon price", price)?;
                        Ok(Addon::new(selection.name.clone(), price))
                    }
                }
            })
            .collect()
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_core::StoreResult;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    struct MenuStub(HashMap<FoodId, Food>);

    #[async_trait]
    impl FoodCatalog for MenuStub {
        async fn get_food(&self, id: FoodId) -> StoreResult<Option<Food>> {
            Ok(self.0.get(&id).cloned())
        }
    }

    fn cheeseburger() -> Food {
        Food {
            id: 1,
            name: "Classic Cheeseburger".to_string(),
            description: None,
            price: dec!(9.99),
            category: Some("Burgers".to_string()),
            available_addons: vec![
                Addon::new("Extra Patty", dec!(2.50)),
                Addon::new("Bacon", dec!(1.50)),
            ],
        }
    }

    fn menu() -> MenuStub {
        MenuStub(HashMap::from([(1, cheeseburger())]))
    }

    fn bacon(price: Option<Decimal>) -> AddonSelection {
        AddonSelection {
            name: "Bacon".to_string(),
            price,
        }
    }

    #[tokio::test]
    async fn test_total_is_sum_of_lines_plus_fee() {
        let engine = PricingEngine::default();
        let lines = vec![
            LineItemRequest {
                food_id: 1,
                quantity: 1,
                addons: vec![bacon(Some(dec!(1.50)))],
            },
            LineItemRequest {
                food_id: 1,
                quantity: 1,
                addons: vec![],
            },
        ];

        let quote = engine.quote(&menu(), &lines, Some(dec!(2.00))).await.unwrap();

        assert_eq!(quote.lines[0].subtotal, dec!(11.49));
        assert_eq!(quote.lines[1].subtotal, dec!(9.99));
        assert_eq!(quote.total, dec!(23.48));
    }

    #[tokio::test]
    async fn test_addons_scale_with_quantity() {
        let engine = PricingEngine::default();
        let lines = vec![LineItemRequest {
            food_id: 1,
            quantity: 2,
            addons: vec![bacon(None)],
        }];

        let quote = engine.quote(&menu(), &lines, None).await.unwrap();

        assert_eq!(quote.delivery_fee, Decimal::ZERO);
        assert_eq!(quote.total, dec!(22.98));
        assert_eq!(quote.lines[0].addons, vec![Addon::new("Bacon", dec!(1.50))]);
    }

    #[tokio::test]
    async fn test_unknown_food_rejected() {
        let engine = PricingEngine::default();
        let lines = vec![
            LineItemRequest {
                food_id: 1,
                quantity: 1,
                addons: vec![],
            },
            LineItemRequest {
                food_id: 404,
                quantity: 1,
                addons: vec![],
            },
        ];

        let err = engine.quote(&menu(), &lines, None).await.unwrap_err();
        assert!(matches!(err, PricingError::UnknownFood(404)));
    }

    #[tokio::test]
    async fn test_catalog_source_overrides_client_price() {
        let engine = PricingEngine::default();
        let lines = vec![LineItemRequest {
            food_id: 1,
            quantity: 1,
            addons: vec![bacon(Some(dec!(0.01)))],
        }];

        let quote = engine.quote(&menu(), &lines, None).await.unwrap();
        assert_eq!(quote.total, dec!(11.49));
    }

    #[tokio::test]
    async fn test_catalog_source_rejects_unknown_addon() {
        let engine = PricingEngine::default();
        let lines = vec![LineItemRequest {
            food_id: 1,
            quantity: 1,
            addons: vec![AddonSelection {
                name: "Truffle".to_string(),
                price: Some(dec!(0.50)),
            }],
        }];

        let err = engine.quote(&menu(), &lines, None).await.unwrap_err();
        assert!(matches!(err, PricingError::UnknownAddon { food_id: 1, .. }));
    }

    #[tokio::test]
    async fn test_request_source_trusts_client_price() {
        let engine = PricingEngine::new(PricingConfig {
            addon_price_source: AddonPriceSource::Request,
        });
        let lines = vec![LineItemRequest {
            food_id: 1,
            quantity: 2,
            addons: vec![
                AddonSelection {
                    name: "Truffle".to_string(),
                    price: Some(dec!(3.00)),
                },
                AddonSelection {
                    name: "Napkins".to_string(),
                    price: None,
                },
            ],
        }];

        let quote = engine.quote(&menu(), &lines, Some(dec!(1.00))).await.unwrap();

        // 9.99 * 2 + 3.00 * 2 + 1.00
        assert_eq!(quote.total, dec!(26.98));
        assert_eq!(quote.lines[0].addons[1], Addon::new("Napkins", Decimal::ZERO));
    }

    #[tokio::test]
    async fn test_huge_delivery_fee_is_rejected_not_overflowed() {
        let engine = PricingEngine::default();
        let lines = vec![LineItemRequest {
            food_id: 1,
            quantity: 1,
            addons: vec![],
        }];

        let err = engine
            .quote(&menu(), &lines, Some(Decimal::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, PricingError::AmountOutOfRange(_)));
    }

    #[tokio::test]
    async fn test_total_beyond_column_range_is_rejected() {
        let mut pricey = cheeseburger();
        pricey.price = max_price();
        let engine = PricingEngine::default();
        let lines = vec![LineItemRequest {
            food_id: 1,
            quantity: i32::MAX,
            addons: vec![bacon(None)],
        }];

        let err = engine
            .quote(&MenuStub(HashMap::from([(1, pricey)])), &lines, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PricingError::AmountOutOfRange(_)));
    }

    #[tokio::test]
    async fn test_sub_cent_amounts_are_rejected() {
        let engine = PricingEngine::new(PricingConfig {
            addon_price_source: AddonPriceSource::Request,
        });
        let plain = vec![LineItemRequest {
            food_id: 1,
            quantity: 1,
            addons: vec![],
        }];
        let err = engine
            .quote(&menu(), &plain, Some(dec!(0.005)))
            .await
            .unwrap_err();
        assert!(matches!(err, PricingError::AmountOutOfRange(_)));

        let with_addon = vec![LineItemRequest {
            food_id: 1,
            quantity: 1,
            addons: vec![bacon(Some(dec!(1.505)))],
        }];
        let err = engine.quote(&menu(), &with_addon, None).await.unwrap_err();
        assert!(matches!(err, PricingError::AmountOutOfRange(_)));
    }

    #[tokio::test]
    async fn test_total_equals_lines_plus_fee_exactly() {
        let engine = PricingEngine::default();
        let lines = vec![LineItemRequest {
            food_id: 1,
            quantity: 3,
            addons: vec![bacon(None)],
        }];

        let quote = engine.quote(&menu(), &lines, Some(dec!(2.000))).await.unwrap();

        let lines_total: Decimal = quote.lines.iter().map(|l| l.subtotal).sum();
        assert_eq!(quote.total, lines_total + quote.delivery_fee);
        assert_eq!(quote.total, dec!(36.47));
    }

    #[test]
    fn test_check_amount_bounds() {
        assert!(check_amount("fee", Decimal::ZERO).is_ok());
        assert!(check_amount("fee", dec!(2.50)).is_ok());
        assert!(check_amount("fee", dec!(2.500)).is_ok());
        assert!(check_amount("fee", max_price()).is_ok());
        assert!(check_amount("fee", max_price() + dec!(0.01)).is_err());
        assert!(check_amount("fee", dec!(-0.01)).is_err());
        assert!(check_amount("fee", dec!(0.001)).is_err());
    }

    #[test]
    fn test_addon_source_deserializes_snake_case() {
        let config: PricingConfig =
            serde_json::from_str(r#"{"addon_price_source":"request"}"#).unwrap();
        assert_eq!(config.addon_price_source, AddonPriceSource::Request);

        let config: PricingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.addon_price_source, AddonPriceSource::Catalog);
    }
}
