//! Order desk library
//!
//! Order records on an embedded SQLite store: paginated listings, single-row
//! CRUD, bulk status/duplicate/delete and sequential `#ORD` numbering.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod migrator;
pub mod repositories;
pub mod services;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use repositories::{OrderRepository, OrderRepositoryConfig};
use services::BulkOrderService;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub orders: Arc<OrderRepository>,
    pub bulk: Arc<BulkOrderService>,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let orders = Arc::new(OrderRepository::new(
            db.clone(),
            OrderRepositoryConfig::from(&config),
        ));
        let bulk = Arc::new(BulkOrderService::new(orders.clone()));
        Self {
            db,
            config,
            orders,
            bulk,
        }
    }
}

/// Order routes, without middleware.
pub fn api_routes() -> Router<AppState> {
    use handlers::orders;

    // static `bulk` segments win over `:id`
    Router::new()
        .route("/orders", get(orders::list_orders).post(orders::create_order))
        .route("/orders/bulk", delete(orders::bulk_delete))
        .route("/orders/bulk/status", put(orders::bulk_update_status))
        .route("/orders/bulk/duplicate", post(orders::bulk_duplicate))
        .route(
            "/orders/:id",
            get(orders::get_order)
                .put(orders::update_order)
                .delete(orders::delete_order),
        )
}

/// The full application: routes, state and HTTP middleware.
pub fn app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    let cors = state.config.cors_allow_any_origin;

    let router = api_routes()
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout));

    let router = if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}

// Request logging middleware
async fn request_logging_middleware(
    request: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = status.as_u16(),
        elapsed_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}
