use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::location_update::{self, Entity as LocationUpdateEntity},
    entities::shipment::Entity as ShipmentEntity,
    errors::ServiceError,
    events::{Event, EventSender},
    realtime::{RealtimeHub, ServerMessage},
};

/// An externally reported GPS point for a shipment
#[derive(Debug, Clone)]
pub struct LocationReport {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
}

/// Ingests reported shipment positions.
///
/// Persist and publish are two deliberate phases: the row is the durable
/// record, the realtime broadcast is best-effort and never unwinds it.
#[derive(Clone)]
pub struct LocationTrackingService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    hub: Arc<RealtimeHub>,
}

impl LocationTrackingService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, hub: Arc<RealtimeHub>) -> Self {
        Self {
            db_pool,
            event_sender,
            hub,
        }
    }

    /// Persists a location report and broadcasts it to the shipment's topic
    #[instrument(skip(self, report))]
    pub async fn record_update(
        &self,
        shipment_id: Uuid,
        report: LocationReport,
    ) -> Result<location_update::Model, ServiceError> {
        let shipment = ShipmentEntity::find_by_id(shipment_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Shipment {} not found", shipment_id)))?;

        let active = location_update::ActiveModel {
            id: Set(Uuid::new_v4()),
            shipment_id: Set(shipment_id),
            latitude: Set(report.latitude),
            longitude: Set(report.longitude),
            timestamp: Set(report.timestamp),
            speed: Set(report.speed),
            heading: Set(report.heading),
            created_at: Set(Utc::now()),
        };
        let model = active.insert(&*self.db_pool).await?;

        // The row is committed; anything past this point is best-effort.
        self.hub.publish(
            shipment_id,
            ServerMessage::LocationUpdate {
                shipment_id,
                latitude: model.latitude,
                longitude: model.longitude,
                timestamp: model.timestamp,
                speed: model.speed,
                heading: model.heading,
                tracking_number: shipment.tracking_number,
            },
        );

        let _ = self
            .event_sender
            .send(Event::ShipmentLocationUpdated {
                shipment_id,
                latitude: model.latitude,
                longitude: model.longitude,
            })
            .await;

        Ok(model)
    }

    /// Location history for a shipment, oldest first
    #[instrument(skip(self))]
    pub async fn history(
        &self,
        shipment_id: Uuid,
    ) -> Result<Vec<location_update::Model>, ServiceError> {
        let updates = LocationUpdateEntity::find()
            .filter(location_update::Column::ShipmentId.eq(shipment_id))
            .order_by_asc(location_update::Column::Timestamp)
            .all(&*self.db_pool)
            .await?;

        Ok(updates)
    }
}
