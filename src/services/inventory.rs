use chrono::Utc;
use metrics::counter;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, TransactionTrait,
};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::inventory::{self, Entity as InventoryEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// The inventory ledger: reservation, release and transfer over
/// per-(product, location) stock records.
///
/// Every mutation keeps `0 <= reserved_quantity <= quantity`. The one
/// deliberate exception is `transfer`, which does not guard the source
/// quantity; callers are expected to have reserved the stock first.
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl InventoryService {
    /// Creates a new inventory service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Places a soft hold on stock. Returns false without mutating anything
    /// when no record exists for the pair or available stock is short.
    #[instrument(skip(self))]
    pub async fn reserve(
        &self,
        product_id: Uuid,
        location_id: Uuid,
        quantity: i32,
    ) -> Result<bool, ServiceError> {
        let reserved = Self::reserve_in(&*self.db_pool, product_id, location_id, quantity).await?;

        if reserved {
            let _ = self
                .event_sender
                .send(Event::InventoryReserved {
                    product_id,
                    location_id,
                    quantity,
                })
                .await;
        }

        Ok(reserved)
    }

    /// Transaction-scoped form of [`reserve`](Self::reserve) so callers can
    /// fold the hold into their own transactional boundary.
    ///
    /// The availability check and the increment are one conditional UPDATE,
    /// so concurrent reservations racing on the same record can never
    /// oversell: whichever statement runs second no longer matches the
    /// `available >= quantity` predicate.
    pub(crate) async fn reserve_in<C: ConnectionTrait>(
        conn: &C,
        product_id: Uuid,
        location_id: Uuid,
        quantity: i32,
    ) -> Result<bool, ServiceError> {
        let result = InventoryEntity::update_many()
            .col_expr(
                inventory::Column::ReservedQuantity,
                Expr::col(inventory::Column::ReservedQuantity).add(quantity),
            )
            .col_expr(inventory::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(inventory::Column::ProductId.eq(product_id))
            .filter(inventory::Column::LocationId.eq(location_id))
            .filter(Expr::cust_with_values(
                "quantity - reserved_quantity >= ?",
                [quantity],
            ))
            .exec(conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Returns reserved stock to the available pool, floored at zero.
    #[instrument(skip(self))]
    pub async fn release(
        &self,
        product_id: Uuid,
        location_id: Uuid,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        Self::release_in(&txn, product_id, location_id, quantity).await?;
        txn.commit().await?;

        let _ = self
            .event_sender
            .send(Event::InventoryReleased {
                product_id,
                location_id,
                quantity,
            })
            .await;

        Ok(())
    }

    /// Transaction-scoped form of [`release`](Self::release).
    ///
    /// Releasing more than is held is tolerated (the count floors at zero)
    /// because inconsistent callers do exist, but every occurrence is logged
    /// and counted so it surfaces as the caller bug it usually is.
    pub(crate) async fn release_in<C: ConnectionTrait>(
        conn: &C,
        product_id: Uuid,
        location_id: Uuid,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        let record = InventoryEntity::find()
            .filter(inventory::Column::ProductId.eq(product_id))
            .filter(inventory::Column::LocationId.eq(location_id))
            .one(conn)
            .await?;

        let Some(record) = record else {
            warn!(
                product_id = %product_id,
                location_id = %location_id,
                "Release against missing inventory record ignored"
            );
            counter!("inventory_over_release_total", 1);
            return Ok(());
        };

        if quantity > record.reserved_quantity {
            warn!(
                product_id = %product_id,
                location_id = %location_id,
                reserved = record.reserved_quantity,
                requested = quantity,
                "Over-release floored at zero"
            );
            counter!("inventory_over_release_total", 1);
        }

        let new_reserved = (record.reserved_quantity - quantity).max(0);
        let mut active: inventory::ActiveModel = record.into();
        active.reserved_quantity = Set(new_reserved);
        active.updated_at = Set(Utc::now());
        active.update(conn).await?;

        Ok(())
    }

    /// Moves committed stock between locations, consuming any reservation
    /// made at the source. The destination record is created lazily.
    #[instrument(skip(self))]
    pub async fn transfer(
        &self,
        product_id: Uuid,
        from_location_id: Uuid,
        to_location_id: Uuid,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        Self::transfer_in(&txn, product_id, from_location_id, to_location_id, quantity).await?;
        txn.commit().await?;

        let _ = self
            .event_sender
            .send(Event::InventoryTransferred {
                product_id,
                from_location_id,
                to_location_id,
                quantity,
            })
            .await;

        Ok(())
    }

    /// Transaction-scoped form of [`transfer`](Self::transfer). Both rows
    /// are written inside the caller's transaction.
    pub(crate) async fn transfer_in<C: ConnectionTrait>(
        conn: &C,
        product_id: Uuid,
        from_location_id: Uuid,
        to_location_id: Uuid,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        let source = InventoryEntity::find()
            .filter(inventory::Column::ProductId.eq(product_id))
            .filter(inventory::Column::LocationId.eq(from_location_id))
            .one(conn)
            .await?;

        match source {
            Some(record) => {
                let new_quantity = record.quantity - quantity;
                let new_reserved = (record.reserved_quantity - quantity).max(0);
                let mut active: inventory::ActiveModel = record.into();
                active.quantity = Set(new_quantity);
                active.reserved_quantity = Set(new_reserved);
                active.updated_at = Set(Utc::now());
                active.update(conn).await?;
            }
            None => {
                warn!(
                    product_id = %product_id,
                    location_id = %from_location_id,
                    "Transfer out of a location with no inventory record"
                );
            }
        }

        let destination = InventoryEntity::find()
            .filter(inventory::Column::ProductId.eq(product_id))
            .filter(inventory::Column::LocationId.eq(to_location_id))
            .one(conn)
            .await?;

        match destination {
            Some(record) => {
                let new_quantity = record.quantity + quantity;
                let mut active: inventory::ActiveModel = record.into();
                active.quantity = Set(new_quantity);
                active.updated_at = Set(Utc::now());
                active.update(conn).await?;
            }
            None => {
                let now = Utc::now();
                let active = inventory::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    product_id: Set(product_id),
                    location_id: Set(to_location_id),
                    quantity: Set(quantity),
                    reserved_quantity: Set(0),
                    min_stock_level: Set(10),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                active.insert(conn).await?;
            }
        }

        Ok(())
    }

    /// Gets the inventory record for a product at a location
    #[instrument(skip(self))]
    pub async fn get_inventory(
        &self,
        product_id: Uuid,
        location_id: Uuid,
    ) -> Result<Option<inventory::Model>, ServiceError> {
        let record = InventoryEntity::find()
            .filter(inventory::Column::ProductId.eq(product_id))
            .filter(inventory::Column::LocationId.eq(location_id))
            .one(&*self.db_pool)
            .await?;

        Ok(record)
    }

    /// Explicitly creates a stock record for a (product, location) pair
    #[instrument(skip(self))]
    pub async fn create_inventory(
        &self,
        product_id: Uuid,
        location_id: Uuid,
        quantity: i32,
        min_stock_level: Option<i32>,
    ) -> Result<inventory::Model, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::ValidationError(
                "quantity must not be negative".to_string(),
            ));
        }

        let existing = self.get_inventory(product_id, location_id).await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Inventory record for product {} at location {} already exists",
                product_id, location_id
            )));
        }

        let now = Utc::now();
        let active = inventory::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            location_id: Set(location_id),
            quantity: Set(quantity),
            reserved_quantity: Set(0),
            min_stock_level: Set(min_stock_level.unwrap_or(10)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active.insert(&*self.db_pool).await?;
        Ok(model)
    }

    /// Lists all inventory records with pagination
    #[instrument(skip(self))]
    pub async fn list_inventory(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<inventory::Model>, u64), ServiceError> {
        let paginator = InventoryEntity::find().paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let records = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((records, total))
    }

    /// Records whose on-hand quantity has fallen to their minimum stock level
    #[instrument(skip(self))]
    pub async fn get_low_stock_items(&self) -> Result<Vec<inventory::Model>, ServiceError> {
        let records = InventoryEntity::find()
            .filter(Expr::cust("quantity <= min_stock_level"))
            .all(&*self.db_pool)
            .await?;

        Ok(records)
    }
}
