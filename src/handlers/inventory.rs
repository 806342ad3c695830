use crate::{
    entities::{inventory, location, product},
    errors::ServiceError,
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InventoryListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "110e8400-e29b-41d4-a716-446655440000",
    "product_id": "770e8400-e29b-41d4-a716-446655440000",
    "location_id": "550e8400-e29b-41d4-a716-446655440000",
    "quantity": 100,
    "reserved_quantity": 20,
    "available_quantity": 80,
    "min_stock_level": 10
}))]
pub struct InventorySummary {
    pub id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    /// Total on-hand quantity
    pub quantity: i32,
    /// Soft holds against on-hand stock
    pub reserved_quantity: i32,
    /// quantity - reserved_quantity
    pub available_quantity: i32,
    pub min_stock_level: i32,
}

impl From<inventory::Model> for InventorySummary {
    fn from(model: inventory::Model) -> Self {
        let available_quantity = model.available_quantity();
        Self {
            id: model.id,
            product_id: model.product_id,
            location_id: model.location_id,
            quantity: model.quantity,
            reserved_quantity: model.reserved_quantity,
            available_quantity,
            min_stock_level: model.min_stock_level,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "product_id": "770e8400-e29b-41d4-a716-446655440000",
    "location_id": "550e8400-e29b-41d4-a716-446655440000",
    "quantity": 100,
    "min_stock_level": 10
}))]
pub struct CreateInventoryRequest {
    pub product_id: Uuid,
    pub location_id: Uuid,
    #[validate(range(min = 0))]
    pub quantity: i32,
    pub min_stock_level: Option<i32>,
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    params(InventoryListQuery),
    responses(
        (status = 200, description = "Inventory listed", body = ApiResponse<PaginatedResponse<InventorySummary>>)
    ),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(query): Query<InventoryListQuery>,
) -> ApiResult<PaginatedResponse<InventorySummary>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let (records, total) = state.services.inventory.list_inventory(page, limit).await?;

    let items: Vec<InventorySummary> = records.into_iter().map(InventorySummary::from).collect();
    let total_pages = (total + limit - 1) / limit;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    request_body = CreateInventoryRequest,
    responses(
        (status = 200, description = "Inventory record created", body = ApiResponse<InventorySummary>),
        (status = 409, description = "Record already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_inventory(
    State(state): State<AppState>,
    Json(payload): Json<CreateInventoryRequest>,
) -> ApiResult<InventorySummary> {
    payload.validate()?;

    let model = state
        .services
        .inventory
        .create_inventory(
            payload.product_id,
            payload.location_id,
            payload.quantity,
            payload.min_stock_level,
        )
        .await?;

    Ok(Json(ApiResponse::success(InventorySummary::from(model))))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/location/{location_id}/product/{product_id}",
    params(
        ("location_id" = Uuid, Path, description = "Location ID"),
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Inventory fetched", body = ApiResponse<InventorySummary>),
        (status = 404, description = "Inventory not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_inventory(
    State(state): State<AppState>,
    Path((location_id, product_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<InventorySummary> {
    match state
        .services
        .inventory
        .get_inventory(product_id, location_id)
        .await?
    {
        Some(model) => Ok(Json(ApiResponse::success(InventorySummary::from(model)))),
        None => Err(ServiceError::NotFound(format!(
            "Inventory for product {} at location {} not found",
            product_id, location_id
        ))),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/low-stock",
    responses(
        (status = 200, description = "Low stock records", body = ApiResponse<Vec<InventorySummary>>)
    ),
    tag = "inventory"
)]
pub async fn get_low_stock_items(
    State(state): State<AppState>,
) -> ApiResult<Vec<InventorySummary>> {
    let records = state.services.inventory.get_low_stock_items().await?;
    let items: Vec<InventorySummary> = records.into_iter().map(InventorySummary::from).collect();

    Ok(Json(ApiResponse::success(items)))
}

// Catalog plumbing: locations and products are plain persistence records
// the ledger and shipments reference by id.

#[derive(Debug, Serialize, ToSchema)]
pub struct LocationSummary {
    pub id: Uuid,
    pub name: String,
    pub location_type: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: bool,
}

impl From<location::Model> for LocationSummary {
    fn from(model: location::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            location_type: model.location_type,
            address: model.address,
            latitude: model.latitude,
            longitude: model.longitude,
            is_active: model.is_active,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub category: Option<String>,
    pub weight_kg: Option<f64>,
}

impl From<product::Model> for ProductSummary {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            sku: model.sku,
            description: model.description,
            unit_price: model.unit_price,
            category: model.category,
            weight_kg: model.weight_kg,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLocationRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub location_type: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub sku: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub category: Option<String>,
    pub weight_kg: Option<f64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/locations",
    responses((status = 200, description = "Locations listed", body = ApiResponse<Vec<LocationSummary>>)),
    tag = "catalog"
)]
pub async fn list_locations(State(state): State<AppState>) -> ApiResult<Vec<LocationSummary>> {
    let locations = location::Entity::find().all(&*state.db).await?;
    let items: Vec<LocationSummary> = locations.into_iter().map(LocationSummary::from).collect();
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    post,
    path = "/api/v1/locations",
    request_body = CreateLocationRequest,
    responses((status = 200, description = "Location created", body = ApiResponse<LocationSummary>)),
    tag = "catalog"
)]
pub async fn create_location(
    State(state): State<AppState>,
    Json(payload): Json<CreateLocationRequest>,
) -> ApiResult<LocationSummary> {
    payload.validate()?;

    let now = Utc::now();
    let active = location::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        location_type: Set(payload.location_type),
        address: Set(payload.address),
        latitude: Set(payload.latitude),
        longitude: Set(payload.longitude),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let model = active.insert(&*state.db).await?;
    Ok(Json(ApiResponse::success(LocationSummary::from(model))))
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    responses((status = 200, description = "Products listed", body = ApiResponse<Vec<ProductSummary>>)),
    tag = "catalog"
)]
pub async fn list_products(State(state): State<AppState>) -> ApiResult<Vec<ProductSummary>> {
    let products = product::Entity::find().all(&*state.db).await?;
    let items: Vec<ProductSummary> = products.into_iter().map(ProductSummary::from).collect();
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses((status = 200, description = "Product created", body = ApiResponse<ProductSummary>)),
    tag = "catalog"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> ApiResult<ProductSummary> {
    payload.validate()?;

    let now = Utc::now();
    let active = product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        sku: Set(payload.sku),
        description: Set(payload.description),
        unit_price: Set(payload.unit_price),
        category: Set(payload.category),
        weight_kg: Set(payload.weight_kg),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let model = active.insert(&*state.db).await?;
    Ok(Json(ApiResponse::success(ProductSummary::from(model))))
}
