use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::shipment::{self, Entity as ShipmentEntity, ShipmentStatus},
    entities::shipment_item::{self, Entity as ShipmentItemEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    realtime::{RealtimeHub, ServerMessage},
    services::inventory::InventoryService,
};

/// Input for creating a shipment
#[derive(Debug, Clone)]
pub struct CreateShipment {
    pub tracking_number: String,
    pub origin_location_id: Uuid,
    pub destination_location_id: Uuid,
    pub estimated_delivery: Option<DateTime<Utc>>,
}

/// Input for adding an item to a shipment
#[derive(Debug, Clone)]
pub struct NewShipmentItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Service for managing shipments and driving their status lifecycle.
///
/// Status transitions and their inventory side effects share one
/// transaction, so a failed commit leaves neither applied. Realtime
/// notification happens after the commit and is best-effort.
#[derive(Clone)]
pub struct ShipmentService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    hub: Arc<RealtimeHub>,
}

impl ShipmentService {
    /// Creates a new shipment service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, hub: Arc<RealtimeHub>) -> Self {
        Self {
            db_pool,
            event_sender,
            hub,
        }
    }

    /// Creates a new shipment in `pending` state
    #[instrument(skip(self))]
    pub async fn create_shipment(
        &self,
        input: CreateShipment,
    ) -> Result<shipment::Model, ServiceError> {
        let now = Utc::now();
        let active = shipment::ActiveModel {
            id: Set(Uuid::new_v4()),
            tracking_number: Set(input.tracking_number),
            origin_location_id: Set(input.origin_location_id),
            destination_location_id: Set(input.destination_location_id),
            status: Set(ShipmentStatus::Pending.as_str().to_string()),
            estimated_delivery: Set(input.estimated_delivery),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active.insert(&*self.db_pool).await?;
        let _ = self
            .event_sender
            .send(Event::ShipmentCreated(model.id))
            .await;

        Ok(model)
    }

    /// Gets a shipment by ID
    #[instrument(skip(self))]
    pub async fn get_shipment(
        &self,
        shipment_id: Uuid,
    ) -> Result<Option<shipment::Model>, ServiceError> {
        let model = ShipmentEntity::find_by_id(shipment_id)
            .one(&*self.db_pool)
            .await?;

        Ok(model)
    }

    /// Finds a shipment by tracking number
    #[instrument(skip(self))]
    pub async fn find_by_tracking_number(
        &self,
        tracking_number: &str,
    ) -> Result<Option<shipment::Model>, ServiceError> {
        let model = ShipmentEntity::find()
            .filter(shipment::Column::TrackingNumber.eq(tracking_number.to_string()))
            .one(&*self.db_pool)
            .await?;

        Ok(model)
    }

    /// Lists shipments with pagination and an optional status filter
    #[instrument(skip(self))]
    pub async fn list_shipments(
        &self,
        page: u64,
        limit: u64,
        status: Option<String>,
    ) -> Result<(Vec<shipment::Model>, u64), ServiceError> {
        let mut query = ShipmentEntity::find().order_by_desc(shipment::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(shipment::Column::Status.eq(status));
        }

        let paginator = query.paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let records = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((records, total))
    }

    /// Updates non-lifecycle fields on a shipment
    #[instrument(skip(self))]
    pub async fn update_estimated_delivery(
        &self,
        shipment_id: Uuid,
        estimated_delivery: Option<DateTime<Utc>>,
    ) -> Result<shipment::Model, ServiceError> {
        let model = self
            .get_shipment(shipment_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Shipment {} not found", shipment_id)))?;

        let mut active: shipment::ActiveModel = model.into();
        active.estimated_delivery = Set(estimated_delivery);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db_pool).await?;
        Ok(updated)
    }

    /// Items currently on a shipment
    #[instrument(skip(self))]
    pub async fn get_items(
        &self,
        shipment_id: Uuid,
    ) -> Result<Vec<shipment_item::Model>, ServiceError> {
        let items = ShipmentItemEntity::find()
            .filter(shipment_item::Column::ShipmentId.eq(shipment_id))
            .all(&*self.db_pool)
            .await?;

        Ok(items)
    }

    /// Adds an item to a shipment.
    ///
    /// While the shipment is pending the item's quantity is reserved at the
    /// origin location inside the same transaction as the insert; if the
    /// reservation cannot be satisfied nothing is persisted.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        shipment_id: Uuid,
        item: NewShipmentItem,
    ) -> Result<shipment_item::Model, ServiceError> {
        if item.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "quantity must be positive".to_string(),
            ));
        }

        let txn = self.db_pool.begin().await?;

        let shipment = ShipmentEntity::find_by_id(shipment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Shipment {} not found", shipment_id)))?;

        let reserve_needed = shipment.status() == ShipmentStatus::Pending;
        if reserve_needed {
            let reserved = InventoryService::reserve_in(
                &txn,
                item.product_id,
                shipment.origin_location_id,
                item.quantity,
            )
            .await?;

            if !reserved {
                // Dropping the transaction rolls the reservation attempt back.
                return Err(ServiceError::InsufficientStock(format!(
                    "product {} at location {}",
                    item.product_id, shipment.origin_location_id
                )));
            }
        }

        let active = shipment_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            shipment_id: Set(shipment_id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            unit_price: Set(item.unit_price),
            created_at: Set(Utc::now()),
        };
        let model = active.insert(&txn).await?;

        txn.commit().await?;

        if reserve_needed {
            let _ = self
                .event_sender
                .send(Event::InventoryReserved {
                    product_id: model.product_id,
                    location_id: shipment.origin_location_id,
                    quantity: model.quantity,
                })
                .await;
        }

        Ok(model)
    }

    /// Removes an item from a shipment, returning its reservation to the
    /// available pool when the shipment has not been dispatched yet.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        shipment_id: Uuid,
        item_id: Uuid,
    ) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;

        let shipment = ShipmentEntity::find_by_id(shipment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Shipment {} not found", shipment_id)))?;

        let item = ShipmentItemEntity::find_by_id(item_id)
            .filter(shipment_item::Column::ShipmentId.eq(shipment_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Shipment item {} not found", item_id)))?;

        if shipment.status() == ShipmentStatus::Pending {
            InventoryService::release_in(
                &txn,
                item.product_id,
                shipment.origin_location_id,
                item.quantity,
            )
            .await?;
        }

        item.delete(&txn).await?;
        txn.commit().await?;

        Ok(())
    }

    /// Drives a status transition, applying inventory side effects in the
    /// same transaction as the status write.
    ///
    /// pending -> dispatched transfers every item's quantity from origin to
    /// destination; pending -> cancelled releases every reservation. All
    /// other legal transitions are pure status changes.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        shipment_id: Uuid,
        new_status: ShipmentStatus,
    ) -> Result<shipment::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;

        let shipment = ShipmentEntity::find_by_id(shipment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Shipment {} not found", shipment_id)))?;

        let old_status = shipment.status();
        if !old_status.can_transition_to(&new_status) {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot transition shipment {} from {} to {}",
                shipment_id, old_status, new_status
            )));
        }

        match (&old_status, &new_status) {
            (ShipmentStatus::Pending, ShipmentStatus::Dispatched) => {
                let items = ShipmentItemEntity::find()
                    .filter(shipment_item::Column::ShipmentId.eq(shipment_id))
                    .all(&txn)
                    .await?;
                for item in items {
                    InventoryService::transfer_in(
                        &txn,
                        item.product_id,
                        shipment.origin_location_id,
                        shipment.destination_location_id,
                        item.quantity,
                    )
                    .await?;
                }
            }
            (ShipmentStatus::Pending, ShipmentStatus::Cancelled) => {
                let items = ShipmentItemEntity::find()
                    .filter(shipment_item::Column::ShipmentId.eq(shipment_id))
                    .all(&txn)
                    .await?;
                for item in items {
                    InventoryService::release_in(
                        &txn,
                        item.product_id,
                        shipment.origin_location_id,
                        item.quantity,
                    )
                    .await?;
                }
            }
            // Remaining legal transitions carry no inventory side effect.
            _ => {}
        }

        let tracking_number = shipment.tracking_number.clone();
        let mut active: shipment::ActiveModel = shipment.into();
        active.status = Set(new_status.as_str().to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        // Durable state is committed; fan-out is best-effort from here.
        self.hub.publish(
            shipment_id,
            ServerMessage::StatusUpdate {
                shipment_id,
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
                tracking_number: tracking_number.clone(),
                timestamp: Utc::now(),
            },
        );

        let _ = self
            .event_sender
            .send(Event::ShipmentStatusChanged {
                shipment_id,
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
                tracking_number,
            })
            .await;

        Ok(updated)
    }

    /// Cancels a shipment from any non-terminal state
    #[instrument(skip(self))]
    pub async fn cancel_shipment(
        &self,
        shipment_id: Uuid,
    ) -> Result<shipment::Model, ServiceError> {
        self.update_status(shipment_id, ShipmentStatus::Cancelled)
            .await
    }
}
