use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ShipTrack API",
        version = "0.1.0",
        description = r#"
# ShipTrack Logistics & Inventory API

Backend for shipment lifecycle management, per-location inventory with
reservations, and real-time shipment tracking.

## Realtime tracking

Connect to `/ws/tracking` and send JSON messages with a `type` field:
`ping`, `subscribe {shipment_id}`, `unsubscribe {shipment_id}`. Status and
location updates for subscribed shipments are pushed as `status_update` and
`location_update` messages.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "shipments", description = "Shipment lifecycle endpoints"),
        (name = "inventory", description = "Inventory ledger endpoints"),
        (name = "tracking", description = "Location ingest and history"),
        (name = "catalog", description = "Locations and products")
    ),
    paths(
        // Shipments
        crate::handlers::shipments::list_shipments,
        crate::handlers::shipments::create_shipment,
        crate::handlers::shipments::get_shipment,
        crate::handlers::shipments::track_by_number,
        crate::handlers::shipments::update_shipment,
        crate::handlers::shipments::update_status,
        crate::handlers::shipments::cancel_shipment,
        crate::handlers::shipments::get_shipment_items,
        crate::handlers::shipments::add_shipment_item,
        crate::handlers::shipments::remove_shipment_item,

        // Inventory
        crate::handlers::inventory::list_inventory,
        crate::handlers::inventory::create_inventory,
        crate::handlers::inventory::get_inventory,
        crate::handlers::inventory::get_low_stock_items,
        crate::handlers::inventory::list_locations,
        crate::handlers::inventory::create_location,
        crate::handlers::inventory::list_products,
        crate::handlers::inventory::create_product,

        // Tracking
        crate::handlers::tracking::report_location,
        crate::handlers::tracking::location_history,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::ListQuery,

            crate::handlers::shipments::ShipmentSummary,
            crate::handlers::shipments::ShipmentItemSummary,
            crate::handlers::shipments::CreateShipmentRequest,
            crate::handlers::shipments::UpdateShipmentRequest,
            crate::handlers::shipments::UpdateStatusRequest,
            crate::handlers::shipments::AddItemRequest,
            crate::handlers::inventory::InventorySummary,
            crate::handlers::inventory::CreateInventoryRequest,
            crate::handlers::inventory::LocationSummary,
            crate::handlers::inventory::ProductSummary,
            crate::handlers::inventory::CreateLocationRequest,
            crate::handlers::inventory::CreateProductRequest,
            crate::handlers::tracking::LocationReportRequest,
            crate::handlers::tracking::LocationUpdateSummary,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        assert!(json.contains("ShipTrack API"));
        assert!(json.contains("/api/v1/shipments"));
    }
}
