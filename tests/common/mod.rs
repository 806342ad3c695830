use std::sync::Arc;

use axum::Router;
use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use tokio::sync::mpsc;
use uuid::Uuid;

use shiptrack_api::{
    config::AppConfig,
    db::{self, DbConfig},
    entities::{inventory, location, product},
    events::{self, EventSender},
    handlers::AppServices,
    realtime::RealtimeHub,
    AppState,
};

/// Helper harness backed by an in-memory SQLite database.
///
/// A single pooled connection keeps the in-memory database alive for the
/// whole test and serializes writes the way a real store would.
pub struct TestApp {
    pub db: Arc<sea_orm::DatabaseConnection>,
    pub hub: Arc<RealtimeHub>,
    pub services: AppServices,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };

        let pool = db::establish_connection_with_config(&config)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool).await.expect("migrations failed");

        let db = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let hub = Arc::new(RealtimeHub::new(db.clone()));
        let services = AppServices::new(db.clone(), event_sender.clone(), hub.clone());

        let state = AppState {
            db: db.clone(),
            config: AppConfig::new(
                "sqlite::memory:".to_string(),
                "127.0.0.1".to_string(),
                18_080,
                "test".to_string(),
            ),
            event_sender,
            hub: hub.clone(),
            services: services.clone(),
        };

        Self {
            db,
            hub,
            services,
            state,
            _event_task: event_task,
        }
    }

    /// Router wired the way the server binary wires it.
    pub fn router(&self) -> Router {
        Router::new()
            .nest("/api/v1", shiptrack_api::api_v1_routes())
            .merge(shiptrack_api::realtime_routes())
            .with_state(self.state.clone())
    }

    pub async fn seed_location(&self, name: &str) -> Uuid {
        let now = Utc::now();
        let model = location::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            location_type: Set("warehouse".to_string()),
            address: Set(None),
            latitude: Set(None),
            longitude: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("seed location");
        model.id
    }

    pub async fn seed_product(&self, sku: &str) -> Uuid {
        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(format!("Product {}", sku)),
            sku: Set(sku.to_string()),
            description: Set(None),
            unit_price: Set(dec!(19.99)),
            category: Set(None),
            weight_kg: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("seed product");
        model.id
    }

    pub async fn seed_inventory(
        &self,
        product_id: Uuid,
        location_id: Uuid,
        quantity: i32,
        reserved_quantity: i32,
    ) -> Uuid {
        let now = Utc::now();
        let model = inventory::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            location_id: Set(location_id),
            quantity: Set(quantity),
            reserved_quantity: Set(reserved_quantity),
            min_stock_level: Set(10),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("seed inventory");
        model.id
    }

    pub async fn inventory_for(
        &self,
        product_id: Uuid,
        location_id: Uuid,
    ) -> Option<inventory::Model> {
        inventory::Entity::find()
            .filter(inventory::Column::ProductId.eq(product_id))
            .filter(inventory::Column::LocationId.eq(location_id))
            .one(&*self.db)
            .await
            .expect("inventory lookup")
    }
}
