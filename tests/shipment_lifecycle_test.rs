mod common;

use common::TestApp;
use rust_decimal::Decimal;
use shiptrack_api::entities::shipment::ShipmentStatus;
use shiptrack_api::errors::ServiceError;
use shiptrack_api::services::shipments::{CreateShipment, NewShipmentItem};
use uuid::Uuid;

async fn pending_shipment(app: &TestApp, origin: Uuid, destination: Uuid, tracking: &str) -> Uuid {
    app.services
        .shipments
        .create_shipment(CreateShipment {
            tracking_number: tracking.to_string(),
            origin_location_id: origin,
            destination_location_id: destination,
            estimated_delivery: None,
        })
        .await
        .expect("create shipment")
        .id
}

fn item(product_id: Uuid, quantity: i32) -> NewShipmentItem {
    NewShipmentItem {
        product_id,
        quantity,
        unit_price: Decimal::new(999, 2),
    }
}

#[tokio::test]
async fn adding_an_item_reserves_stock_or_fails_atomically() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-ADD").await;
    let l1 = app.seed_location("L1").await;
    let l2 = app.seed_location("L2").await;
    app.seed_inventory(product, l1, 10, 0).await;

    let shipment_id = pending_shipment(&app, l1, l2, "SHIP-ADD").await;

    app.services
        .shipments
        .add_item(shipment_id, item(product, 3))
        .await
        .unwrap();

    let record = app.inventory_for(product, l1).await.unwrap();
    assert_eq!(record.reserved_quantity, 3);

    // Only 7 available; the failed add must leave no item and no hold.
    let err = app
        .services
        .shipments
        .add_item(shipment_id, item(product, 8))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    let items = app.services.shipments.get_items(shipment_id).await.unwrap();
    assert_eq!(items.len(), 1);
    let record = app.inventory_for(product, l1).await.unwrap();
    assert_eq!(record.reserved_quantity, 3);
}

#[tokio::test]
async fn adding_items_to_a_missing_shipment_is_not_found() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-MISS").await;

    let err = app
        .services
        .shipments
        .add_item(Uuid::new_v4(), item(product, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn dispatch_transfers_reserved_stock_to_destination() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-DSP").await;
    let l1 = app.seed_location("L1").await;
    let l2 = app.seed_location("L2").await;
    app.seed_inventory(product, l1, 10, 0).await;

    let shipment_id = pending_shipment(&app, l1, l2, "SHIP-DSP").await;
    app.services
        .shipments
        .add_item(shipment_id, item(product, 5))
        .await
        .unwrap();

    // L1 now holds 10 with 5 reserved.
    let before = app.inventory_for(product, l1).await.unwrap();
    assert_eq!((before.quantity, before.reserved_quantity), (10, 5));

    let updated = app
        .services
        .shipments
        .update_status(shipment_id, ShipmentStatus::Dispatched)
        .await
        .unwrap();
    assert_eq!(updated.status, "dispatched");

    let source = app.inventory_for(product, l1).await.unwrap();
    assert_eq!((source.quantity, source.reserved_quantity), (5, 0));

    let dest = app.inventory_for(product, l2).await.unwrap();
    assert_eq!((dest.quantity, dest.reserved_quantity), (5, 0));
}

#[tokio::test]
async fn cancel_releases_reservations_exactly_once() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-CXL").await;
    let l1 = app.seed_location("L1").await;
    let l2 = app.seed_location("L2").await;
    app.seed_inventory(product, l1, 10, 0).await;

    let shipment_id = pending_shipment(&app, l1, l2, "SHIP-CXL").await;
    app.services
        .shipments
        .add_item(shipment_id, item(product, 3))
        .await
        .unwrap();

    app.services
        .shipments
        .cancel_shipment(shipment_id)
        .await
        .unwrap();

    let record = app.inventory_for(product, l1).await.unwrap();
    assert_eq!(record.reserved_quantity, 0);
    assert_eq!(record.available_quantity(), 10);

    // Cancelled is terminal: a second cancel is rejected, not re-released.
    let err = app
        .services
        .shipments
        .cancel_shipment(shipment_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStatus(_)));

    let record = app.inventory_for(product, l1).await.unwrap();
    assert_eq!(record.reserved_quantity, 0);
}

#[tokio::test]
async fn cancel_after_dispatch_is_a_pure_status_change() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-CAD").await;
    let l1 = app.seed_location("L1").await;
    let l2 = app.seed_location("L2").await;
    app.seed_inventory(product, l1, 10, 0).await;

    let shipment_id = pending_shipment(&app, l1, l2, "SHIP-CAD").await;
    app.services
        .shipments
        .add_item(shipment_id, item(product, 4))
        .await
        .unwrap();
    app.services
        .shipments
        .update_status(shipment_id, ShipmentStatus::Dispatched)
        .await
        .unwrap();

    let source_before = app.inventory_for(product, l1).await.unwrap();
    let dest_before = app.inventory_for(product, l2).await.unwrap();

    let updated = app
        .services
        .shipments
        .cancel_shipment(shipment_id)
        .await
        .unwrap();
    assert_eq!(updated.status, "cancelled");

    // The transfer already consumed the reservation; nothing moves back.
    let source = app.inventory_for(product, l1).await.unwrap();
    let dest = app.inventory_for(product, l2).await.unwrap();
    assert_eq!(source.quantity, source_before.quantity);
    assert_eq!(source.reserved_quantity, source_before.reserved_quantity);
    assert_eq!(dest.quantity, dest_before.quantity);
}

#[tokio::test]
async fn illegal_transitions_are_rejected_without_side_effects() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-ILL").await;
    let l1 = app.seed_location("L1").await;
    let l2 = app.seed_location("L2").await;
    app.seed_inventory(product, l1, 10, 0).await;

    let shipment_id = pending_shipment(&app, l1, l2, "SHIP-ILL").await;
    app.services
        .shipments
        .add_item(shipment_id, item(product, 2))
        .await
        .unwrap();

    // Skipping dispatched is not allowed.
    let err = app
        .services
        .shipments
        .update_status(shipment_id, ShipmentStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStatus(_)));

    let record = app.inventory_for(product, l1).await.unwrap();
    assert_eq!((record.quantity, record.reserved_quantity), (10, 2));

    // Walk the legal path to the terminal state.
    for status in [
        ShipmentStatus::Dispatched,
        ShipmentStatus::InTransit,
        ShipmentStatus::Delivered,
    ] {
        app.services
            .shipments
            .update_status(shipment_id, status)
            .await
            .unwrap();
    }

    let err = app
        .services
        .shipments
        .update_status(shipment_id, ShipmentStatus::Dispatched)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStatus(_)));
}

#[tokio::test]
async fn removing_a_pending_item_returns_its_reservation() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-RMV").await;
    let l1 = app.seed_location("L1").await;
    let l2 = app.seed_location("L2").await;
    app.seed_inventory(product, l1, 10, 0).await;

    let shipment_id = pending_shipment(&app, l1, l2, "SHIP-RMV").await;
    let created = app
        .services
        .shipments
        .add_item(shipment_id, item(product, 4))
        .await
        .unwrap();

    app.services
        .shipments
        .remove_item(shipment_id, created.id)
        .await
        .unwrap();

    let record = app.inventory_for(product, l1).await.unwrap();
    assert_eq!(record.reserved_quantity, 0);
    assert!(app
        .services
        .shipments
        .get_items(shipment_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn tracking_number_lookup_round_trips() {
    let app = TestApp::new().await;
    let l1 = app.seed_location("L1").await;
    let l2 = app.seed_location("L2").await;

    let shipment_id = pending_shipment(&app, l1, l2, "SHIP-FIND").await;

    let found = app
        .services
        .shipments
        .find_by_tracking_number("SHIP-FIND")
        .await
        .unwrap()
        .expect("shipment should be found");
    assert_eq!(found.id, shipment_id);
    assert_eq!(found.status(), ShipmentStatus::Pending);

    assert!(app
        .services
        .shipments
        .find_by_tracking_number("NOPE")
        .await
        .unwrap()
        .is_none());
}
