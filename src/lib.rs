//! ShipTrack API Library
//!
//! This crate provides the core functionality for the ShipTrack API
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod realtime;
pub mod services;

use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, patch, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use realtime::RealtimeHub;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub hub: Arc<RealtimeHub>,
    pub services: handlers::AppServices,
}

// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

// Versioned API routes
pub fn api_v1_routes() -> Router<AppState> {
    let shipments = Router::new()
        .route("/shipments", get(handlers::shipments::list_shipments))
        .route("/shipments", post(handlers::shipments::create_shipment))
        .route("/shipments/:id", get(handlers::shipments::get_shipment))
        .route(
            "/shipments/:id",
            patch(handlers::shipments::update_shipment),
        )
        .route(
            "/shipments/track/:tracking_number",
            get(handlers::shipments::track_by_number),
        )
        .route(
            "/shipments/:id/status",
            put(handlers::shipments::update_status),
        )
        .route(
            "/shipments/:id/cancel",
            post(handlers::shipments::cancel_shipment),
        )
        .route(
            "/shipments/:id/items",
            get(handlers::shipments::get_shipment_items),
        )
        .route(
            "/shipments/:id/items",
            post(handlers::shipments::add_shipment_item),
        )
        .route(
            "/shipments/:id/items/:item_id",
            delete(handlers::shipments::remove_shipment_item),
        )
        .route(
            "/shipments/:id/location",
            post(handlers::tracking::report_location),
        )
        .route(
            "/shipments/:id/locations",
            get(handlers::tracking::location_history),
        );

    let inventory = Router::new()
        .route("/inventory", get(handlers::inventory::list_inventory))
        .route("/inventory", post(handlers::inventory::create_inventory))
        .route(
            "/inventory/low-stock",
            get(handlers::inventory::get_low_stock_items),
        )
        .route(
            "/inventory/location/:location_id/product/:product_id",
            get(handlers::inventory::get_inventory),
        );

    let catalog = Router::new()
        .route("/locations", get(handlers::inventory::list_locations))
        .route("/locations", post(handlers::inventory::create_location))
        .route("/products", get(handlers::inventory::list_products))
        .route("/products", post(handlers::inventory::create_product));

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(shipments)
        .merge(inventory)
        .merge(catalog)
}

/// Routes that live outside the versioned API prefix
pub fn realtime_routes() -> Router<AppState> {
    Router::new().route("/ws/tracking", get(handlers::tracking::websocket_handler))
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "service": "shiptrack-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "realtime": {
            "connections": state.hub.connection_count(),
            "topics": state.hub.topic_count(),
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
