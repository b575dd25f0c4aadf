use courier_order::OrderManager;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderManager>,
    pub auth: AuthConfig,
}
