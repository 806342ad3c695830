mod common;

use common::TestApp;

#[tokio::test]
async fn reserve_rejects_missing_record_and_short_stock() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-RES").await;
    let location = app.seed_location("L1").await;

    // No record yet: hard rejection, nothing created.
    let reserved = app
        .services
        .inventory
        .reserve(product, location, 1)
        .await
        .unwrap();
    assert!(!reserved);
    assert!(app.inventory_for(product, location).await.is_none());

    app.seed_inventory(product, location, 10, 0).await;

    assert!(app
        .services
        .inventory
        .reserve(product, location, 4)
        .await
        .unwrap());
    let record = app.inventory_for(product, location).await.unwrap();
    assert_eq!(record.quantity, 10);
    assert_eq!(record.reserved_quantity, 4);
    assert_eq!(record.available_quantity(), 6);

    // More than available: rejected with no mutation.
    assert!(!app
        .services
        .inventory
        .reserve(product, location, 7)
        .await
        .unwrap());
    let record = app.inventory_for(product, location).await.unwrap();
    assert_eq!(record.reserved_quantity, 4);

    // Exactly the remainder still fits.
    assert!(app
        .services
        .inventory
        .reserve(product, location, 6)
        .await
        .unwrap());
    let record = app.inventory_for(product, location).await.unwrap();
    assert_eq!(record.reserved_quantity, 10);
    assert_eq!(record.available_quantity(), 0);

    assert!(!app
        .services
        .inventory
        .reserve(product, location, 1)
        .await
        .unwrap());
}

#[tokio::test]
async fn release_floors_at_zero_and_leaves_quantity_alone() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-REL").await;
    let location = app.seed_location("L1").await;
    app.seed_inventory(product, location, 10, 5).await;

    app.services
        .inventory
        .release(product, location, 3)
        .await
        .unwrap();
    let record = app.inventory_for(product, location).await.unwrap();
    assert_eq!(record.reserved_quantity, 2);
    assert_eq!(record.quantity, 10);

    // Over-release is tolerated but floored.
    app.services
        .inventory
        .release(product, location, 10)
        .await
        .unwrap();
    let record = app.inventory_for(product, location).await.unwrap();
    assert_eq!(record.reserved_quantity, 0);
    assert_eq!(record.quantity, 10);

    // Releasing against a missing record is a logged no-op, not an error.
    let other_location = app.seed_location("L2").await;
    app.services
        .inventory
        .release(product, other_location, 1)
        .await
        .unwrap();
    assert!(app.inventory_for(product, other_location).await.is_none());
}

#[tokio::test]
async fn transfer_conserves_stock_and_creates_destination_lazily() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-TRN").await;
    let l1 = app.seed_location("L1").await;
    let l2 = app.seed_location("L2").await;
    app.seed_inventory(product, l1, 10, 5).await;

    app.services
        .inventory
        .transfer(product, l1, l2, 5)
        .await
        .unwrap();

    let source = app.inventory_for(product, l1).await.unwrap();
    assert_eq!(source.quantity, 5);
    assert_eq!(source.reserved_quantity, 0);

    // Destination record created with the moved quantity, no reservation.
    let dest = app.inventory_for(product, l2).await.unwrap();
    assert_eq!(dest.quantity, 5);
    assert_eq!(dest.reserved_quantity, 0);

    assert_eq!(source.quantity + dest.quantity, 10);

    // Second transfer hits the existing destination record.
    app.services
        .inventory
        .transfer(product, l1, l2, 2)
        .await
        .unwrap();
    let source = app.inventory_for(product, l1).await.unwrap();
    let dest = app.inventory_for(product, l2).await.unwrap();
    assert_eq!(source.quantity, 3);
    assert_eq!(dest.quantity, 7);
    assert_eq!(source.quantity + dest.quantity, 10);
}

#[tokio::test]
async fn ledger_invariants_hold_across_mixed_operations() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-MIX").await;
    let l1 = app.seed_location("L1").await;
    let l2 = app.seed_location("L2").await;
    app.seed_inventory(product, l1, 20, 0).await;

    let inv = &app.services.inventory;
    assert!(inv.reserve(product, l1, 8).await.unwrap());
    inv.release(product, l1, 3).await.unwrap();
    assert!(inv.reserve(product, l1, 5).await.unwrap());
    inv.transfer(product, l1, l2, 6).await.unwrap();
    inv.release(product, l1, 100).await.unwrap();

    for location in [l1, l2] {
        if let Some(record) = app.inventory_for(product, location).await {
            assert!(record.quantity >= 0, "quantity must stay non-negative");
            assert!(
                record.reserved_quantity >= 0,
                "reserved must stay non-negative"
            );
            assert!(
                record.reserved_quantity <= record.quantity,
                "reserved must never exceed quantity"
            );
        }
    }
}

#[tokio::test]
async fn create_inventory_rejects_duplicates() {
    let app = TestApp::new().await;
    let product = app.seed_product("SKU-DUP").await;
    let location = app.seed_location("L1").await;

    app.services
        .inventory
        .create_inventory(product, location, 5, None)
        .await
        .unwrap();

    let err = app
        .services
        .inventory
        .create_inventory(product, location, 5, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        shiptrack_api::errors::ServiceError::Conflict(_)
    ));
}

#[tokio::test]
async fn low_stock_reports_records_at_or_below_minimum() {
    let app = TestApp::new().await;
    let product_low = app.seed_product("SKU-LOW").await;
    let product_ok = app.seed_product("SKU-OK").await;
    let location = app.seed_location("L1").await;

    // min_stock_level defaults to 10 in the harness.
    app.seed_inventory(product_low, location, 4, 0).await;
    app.seed_inventory(product_ok, location, 40, 0).await;

    let low = app.services.inventory.get_low_stock_items().await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].product_id, product_low);
}
