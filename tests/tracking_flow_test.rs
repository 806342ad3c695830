mod common;

use chrono::Utc;
use common::TestApp;
use rust_decimal::Decimal;
use shiptrack_api::entities::shipment::ShipmentStatus;
use shiptrack_api::realtime::ServerMessage;
use shiptrack_api::services::location_tracking::LocationReport;
use shiptrack_api::services::shipments::{CreateShipment, NewShipmentItem};
use tokio::sync::mpsc;

/// The end-to-end path: reservation on item add, realtime subscription,
/// dispatch with its inventory transfer, and exactly one status broadcast.
#[tokio::test]
async fn dispatch_notifies_subscribers_and_moves_stock() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-E2E").await;
    let l1 = app.seed_location("L1").await;
    let l2 = app.seed_location("L2").await;
    app.seed_inventory(product, l1, 10, 0).await;

    let shipment = app
        .services
        .shipments
        .create_shipment(CreateShipment {
            tracking_number: "SHIP001".to_string(),
            origin_location_id: l1,
            destination_location_id: l2,
            estimated_delivery: None,
        })
        .await
        .unwrap();
    assert_eq!(shipment.status(), ShipmentStatus::Pending);

    app.services
        .shipments
        .add_item(
            shipment.id,
            NewShipmentItem {
                product_id: product,
                quantity: 3,
                unit_price: Decimal::new(1500, 2),
            },
        )
        .await
        .unwrap();
    let record = app.inventory_for(product, l1).await.unwrap();
    assert_eq!(record.reserved_quantity, 3);

    // Client C1 subscribes to the shipment's topic.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let client = app.hub.connect(tx);
    assert!(matches!(
        rx.recv().await,
        Some(ServerMessage::Welcome { .. })
    ));
    assert!(app.hub.subscribe(client, shipment.id).await.unwrap());
    assert!(matches!(
        rx.recv().await,
        Some(ServerMessage::Subscribed { .. })
    ));

    app.services
        .shipments
        .update_status(shipment.id, ShipmentStatus::Dispatched)
        .await
        .unwrap();

    // Exactly one status_update with the right fields.
    match rx.recv().await {
        Some(ServerMessage::StatusUpdate {
            shipment_id,
            old_status,
            new_status,
            tracking_number,
            ..
        }) => {
            assert_eq!(shipment_id, shipment.id);
            assert_eq!(old_status, "pending");
            assert_eq!(new_status, "dispatched");
            assert_eq!(tracking_number, "SHIP001");
        }
        other => panic!("expected status update, got {:?}", other),
    }
    assert!(rx.try_recv().is_err(), "only one status update expected");

    let source = app.inventory_for(product, l1).await.unwrap();
    assert_eq!((source.quantity, source.reserved_quantity), (7, 0));
    let dest = app.inventory_for(product, l2).await.unwrap();
    assert_eq!((dest.quantity, dest.reserved_quantity), (3, 0));
}

#[tokio::test]
async fn location_reports_persist_then_broadcast() {
    let app = TestApp::new().await;
    let l1 = app.seed_location("L1").await;
    let l2 = app.seed_location("L2").await;

    let shipment = app
        .services
        .shipments
        .create_shipment(CreateShipment {
            tracking_number: "SHIP-GPS".to_string(),
            origin_location_id: l1,
            destination_location_id: l2,
            estimated_delivery: None,
        })
        .await
        .unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let client = app.hub.connect(tx);
    let _ = rx.recv().await;
    app.hub.subscribe(client, shipment.id).await.unwrap();
    let _ = rx.recv().await;

    let reported_at = Utc::now();
    app.services
        .location_tracking
        .record_update(
            shipment.id,
            LocationReport {
                latitude: 37.7749,
                longitude: -122.4194,
                timestamp: reported_at,
                speed: Some(65.0),
                heading: Some(270.0),
            },
        )
        .await
        .unwrap();

    match rx.recv().await {
        Some(ServerMessage::LocationUpdate {
            shipment_id,
            latitude,
            longitude,
            speed,
            tracking_number,
            ..
        }) => {
            assert_eq!(shipment_id, shipment.id);
            assert_eq!(latitude, 37.7749);
            assert_eq!(longitude, -122.4194);
            assert_eq!(speed, Some(65.0));
            assert_eq!(tracking_number, "SHIP-GPS");
        }
        other => panic!("expected location update, got {:?}", other),
    }

    let history = app
        .services
        .location_tracking
        .history(shipment.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn location_reports_survive_delivery_failures() {
    let app = TestApp::new().await;
    let l1 = app.seed_location("L1").await;
    let l2 = app.seed_location("L2").await;

    let shipment = app
        .services
        .shipments
        .create_shipment(CreateShipment {
            tracking_number: "SHIP-DUR".to_string(),
            origin_location_id: l1,
            destination_location_id: l2,
            estimated_delivery: None,
        })
        .await
        .unwrap();

    // A subscriber whose receiving end is already gone.
    let (tx, rx) = mpsc::unbounded_channel();
    let client = app.hub.connect(tx);
    app.hub.subscribe(client, shipment.id).await.unwrap();
    drop(rx);

    // The broadcast fails; the durable record must not be rolled back.
    app.services
        .location_tracking
        .record_update(
            shipment.id,
            LocationReport {
                latitude: 40.0,
                longitude: -70.0,
                timestamp: Utc::now(),
                speed: None,
                heading: None,
            },
        )
        .await
        .unwrap();

    let history = app
        .services
        .location_tracking
        .history(shipment.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(app.hub.connection_count(), 0);
}

#[tokio::test]
async fn reporting_a_location_for_a_missing_shipment_is_not_found() {
    let app = TestApp::new().await;

    let err = app
        .services
        .location_tracking
        .record_update(
            uuid::Uuid::new_v4(),
            LocationReport {
                latitude: 0.0,
                longitude: 0.0,
                timestamp: Utc::now(),
                speed: None,
                heading: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        shiptrack_api::errors::ServiceError::NotFound(_)
    ));
}
