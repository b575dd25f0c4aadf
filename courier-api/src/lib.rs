use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod health;
pub mod middleware;
pub mod orders;
pub mod state;

pub use state::{AppState, AuthConfig};

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let protected = orders::routes().route_layer(axum::middleware::from_fn_with_state(
        state.clone(),
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(protected)
        .merge(health::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
