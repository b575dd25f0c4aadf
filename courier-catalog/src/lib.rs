pub mod pricing;

pub use pricing::{
    check_amount, max_price, max_total, AddonPriceSource, AddonSelection, LineItemRequest,
    PriceQuote, PricedLine, PricingConfig, PricingEngine, PricingError, MONEY_SCALE,
};
