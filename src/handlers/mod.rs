pub mod inventory;
pub mod shipments;
pub mod tracking;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::realtime::RealtimeHub;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub inventory: Arc<crate::services::inventory::InventoryService>,
    pub shipments: Arc<crate::services::shipments::ShipmentService>,
    pub location_tracking: Arc<crate::services::location_tracking::LocationTrackingService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, hub: Arc<RealtimeHub>) -> Self {
        let inventory = Arc::new(crate::services::inventory::InventoryService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let shipments = Arc::new(crate::services::shipments::ShipmentService::new(
            db_pool.clone(),
            event_sender.clone(),
            hub.clone(),
        ));
        let location_tracking = Arc::new(
            crate::services::location_tracking::LocationTrackingService::new(
                db_pool,
                event_sender,
                hub,
            ),
        );

        Self {
            inventory,
            shipments,
            location_tracking,
        }
    }
}
