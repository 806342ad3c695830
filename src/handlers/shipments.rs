use crate::{
    entities::shipment::{self, ShipmentStatus},
    entities::shipment_item,
    errors::ServiceError,
    services::shipments::{CreateShipment, NewShipmentItem},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ShipmentListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "990e8400-e29b-41d4-a716-446655440000",
    "tracking_number": "SHIP001",
    "origin_location_id": "550e8400-e29b-41d4-a716-446655440000",
    "destination_location_id": "660e8400-e29b-41d4-a716-446655440000",
    "status": "pending",
    "estimated_delivery": "2025-11-12T18:00:00Z",
    "created_at": "2025-11-09T10:30:00Z",
    "updated_at": "2025-11-09T10:30:00Z"
}))]
pub struct ShipmentSummary {
    /// Shipment UUID
    pub id: Uuid,
    /// Unique tracking number
    #[schema(example = "SHIP001")]
    pub tracking_number: String,
    /// Origin location UUID
    pub origin_location_id: Uuid,
    /// Destination location UUID
    pub destination_location_id: Uuid,
    /// Shipment status (pending, dispatched, in_transit, delivered, cancelled)
    #[schema(example = "pending")]
    pub status: String,
    /// Estimated delivery date
    pub estimated_delivery: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl From<shipment::Model> for ShipmentSummary {
    fn from(model: shipment::Model) -> Self {
        Self {
            id: model.id,
            tracking_number: model.tracking_number,
            origin_location_id: model.origin_location_id,
            destination_location_id: model.destination_location_id,
            status: model.status,
            estimated_delivery: model.estimated_delivery,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShipmentItemSummary {
    pub id: Uuid,
    pub shipment_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl From<shipment_item::Model> for ShipmentItemSummary {
    fn from(model: shipment_item::Model) -> Self {
        Self {
            id: model.id,
            shipment_id: model.shipment_id,
            product_id: model.product_id,
            quantity: model.quantity,
            unit_price: model.unit_price,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "tracking_number": "SHIP001",
    "origin_location_id": "550e8400-e29b-41d4-a716-446655440000",
    "destination_location_id": "660e8400-e29b-41d4-a716-446655440000",
    "estimated_delivery": "2025-11-12T18:00:00Z"
}))]
pub struct CreateShipmentRequest {
    /// Unique tracking number
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "SHIP001")]
    pub tracking_number: String,
    /// Origin location UUID
    pub origin_location_id: Uuid,
    /// Destination location UUID
    pub destination_location_id: Uuid,
    /// Estimated delivery date
    pub estimated_delivery: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateShipmentRequest {
    /// New estimated delivery date; null clears it
    pub estimated_delivery: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({ "status": "dispatched" }))]
pub struct UpdateStatusRequest {
    /// Target status (pending, dispatched, in_transit, delivered, cancelled)
    #[validate(length(min = 1))]
    pub status: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "product_id": "770e8400-e29b-41d4-a716-446655440000",
    "quantity": 3,
    "unit_price": "19.99"
}))]
pub struct AddItemRequest {
    /// Product UUID
    pub product_id: Uuid,
    /// Units to ship; reserved at the origin while the shipment is pending
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Unit price at time of shipping
    pub unit_price: Decimal,
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments",
    params(ShipmentListQuery),
    responses(
        (status = 200, description = "Shipments listed", body = ApiResponse<PaginatedResponse<ShipmentSummary>>)
    ),
    tag = "shipments"
)]
pub async fn list_shipments(
    State(state): State<AppState>,
    Query(query): Query<ShipmentListQuery>,
) -> ApiResult<PaginatedResponse<ShipmentSummary>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let (records, total) = state
        .services
        .shipments
        .list_shipments(page, limit, query.status)
        .await?;

    let items: Vec<ShipmentSummary> = records.into_iter().map(ShipmentSummary::from).collect();
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
    path = "/api/v1/shipments",
    request_body = CreateShipmentRequest,
    responses(
        (status = 200, description = "Shipment created", body = ApiResponse<ShipmentSummary>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    Json(payload): Json<CreateShipmentRequest>,
) -> ApiResult<ShipmentSummary> {
    payload.validate()?;

    let model = state
        .services
        .shipments
        .create_shipment(CreateShipment {
            tracking_number: payload.tracking_number,
            origin_location_id: payload.origin_location_id,
            destination_location_id: payload.destination_location_id,
            estimated_delivery: payload.estimated_delivery,
        })
        .await?;

    Ok(Json(ApiResponse::success(ShipmentSummary::from(model))))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments/{id}",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment fetched", body = ApiResponse<ShipmentSummary>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn get_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ShipmentSummary> {
    match state.services.shipments.get_shipment(id).await? {
        Some(model) => Ok(Json(ApiResponse::success(ShipmentSummary::from(model)))),
        None => Err(ServiceError::NotFound(format!("Shipment {} not found", id))),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments/track/{tracking_number}",
    params(("tracking_number" = String, Path, description = "Tracking number")),
    responses(
        (status = 200, description = "Shipment fetched", body = ApiResponse<ShipmentSummary>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn track_by_number(
    State(state): State<AppState>,
    Path(tracking_number): Path<String>,
) -> ApiResult<ShipmentSummary> {
    match state
        .services
        .shipments
        .find_by_tracking_number(&tracking_number)
        .await?
    {
        Some(model) => Ok(Json(ApiResponse::success(ShipmentSummary::from(model)))),
        None => Err(ServiceError::NotFound(format!(
            "Shipment with tracking number {} not found",
            tracking_number
        ))),
    }
}

#[utoipa::path(
    patch,
    path = "/api/v1/shipments/{id}",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = UpdateShipmentRequest,
    responses(
        (status = 200, description = "Shipment updated", body = ApiResponse<ShipmentSummary>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn update_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateShipmentRequest>,
) -> ApiResult<ShipmentSummary> {
    let model = state
        .services
        .shipments
        .update_estimated_delivery(id, payload.estimated_delivery)
        .await?;

    Ok(Json(ApiResponse::success(ShipmentSummary::from(model))))
}

#[utoipa::path(
    put,
    path = "/api/v1/shipments/{id}/status",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<ShipmentSummary>),
        (status = 400, description = "Invalid transition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<ShipmentSummary> {
    payload.validate()?;

    let target = ShipmentStatus::parse(&payload.status);
    let model = state.services.shipments.update_status(id, target).await?;

    Ok(Json(ApiResponse::success(ShipmentSummary::from(model))))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/{id}/cancel",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment cancelled", body = ApiResponse<ShipmentSummary>),
        (status = 400, description = "Invalid transition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn cancel_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ShipmentSummary> {
    let model = state.services.shipments.cancel_shipment(id).await?;
    Ok(Json(ApiResponse::success(ShipmentSummary::from(model))))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments/{id}/items",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Items listed", body = ApiResponse<Vec<ShipmentItemSummary>>)
    ),
    tag = "shipments"
)]
pub async fn get_shipment_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<ShipmentItemSummary>> {
    let items = state.services.shipments.get_items(id).await?;
    let items: Vec<ShipmentItemSummary> =
        items.into_iter().map(ShipmentItemSummary::from).collect();

    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/{id}/items",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Item added", body = ApiResponse<ShipmentItemSummary>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient inventory", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn add_shipment_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddItemRequest>,
) -> ApiResult<ShipmentItemSummary> {
    payload.validate()?;

    let model = state
        .services
        .shipments
        .add_item(
            id,
            NewShipmentItem {
                product_id: payload.product_id,
                quantity: payload.quantity,
                unit_price: payload.unit_price,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(ShipmentItemSummary::from(model))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/shipments/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Shipment ID"),
        ("item_id" = Uuid, Path, description = "Shipment item ID")
    ),
    responses(
        (status = 200, description = "Item removed", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Shipment or item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn remove_shipment_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<serde_json::Value> {
    state.services.shipments.remove_item(id, item_id).await?;
    Ok(Json(ApiResponse::success(
        json!({ "message": "Item removed successfully" }),
    )))
}
