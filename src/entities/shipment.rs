use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Shipment lifecycle status.
///
/// Stored as text; values outside the known set pass through as
/// `Unknown` so rows written by newer deployments still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShipmentStatus {
    Pending,
    Dispatched,
    InTransit,
    Delivered,
    Cancelled,
    Unknown(String),
}

impl ShipmentStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "pending" => Self::Pending,
            "dispatched" => Self::Dispatched,
            "in_transit" => Self::InTransit,
            "delivered" => Self::Delivered,
            "cancelled" => Self::Cancelled,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Dispatched => "dispatched",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Unknown(other) => other.as_str(),
        }
    }

    /// Delivered and cancelled shipments accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Legal transitions: pending -> dispatched -> in_transit -> delivered,
    /// with cancellation allowed from any non-terminal state.
    pub fn can_transition_to(&self, next: &ShipmentStatus) -> bool {
        if matches!(next, Self::Cancelled) {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Self::Pending, Self::Dispatched)
                | (Self::Dispatched, Self::InTransit)
                | (Self::InTransit, Self::Delivered)
        )
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ShipmentStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ShipmentStatus> for String {
    fn from(value: ShipmentStatus) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub tracking_number: String,
    pub origin_location_id: Uuid,
    pub destination_location_id: Uuid,
    pub status: String,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn status(&self) -> ShipmentStatus {
        ShipmentStatus::parse(&self.status)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::shipment_item::Entity")]
    ShipmentItems,
    #[sea_orm(has_many = "super::location_update::Entity")]
    LocationUpdates,
}

impl Related<super::shipment_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShipmentItems.def()
    }
}

impl Related<super::location_update::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LocationUpdates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::ShipmentStatus;

    #[test]
    fn status_round_trips_unknown_values() {
        let status = ShipmentStatus::parse("quarantined");
        assert_eq!(status, ShipmentStatus::Unknown("quarantined".into()));
        assert_eq!(status.as_str(), "quarantined");
    }

    #[test]
    fn forward_transitions_follow_the_lifecycle() {
        assert!(ShipmentStatus::Pending.can_transition_to(&ShipmentStatus::Dispatched));
        assert!(ShipmentStatus::Dispatched.can_transition_to(&ShipmentStatus::InTransit));
        assert!(ShipmentStatus::InTransit.can_transition_to(&ShipmentStatus::Delivered));

        assert!(!ShipmentStatus::Pending.can_transition_to(&ShipmentStatus::InTransit));
        assert!(!ShipmentStatus::Delivered.can_transition_to(&ShipmentStatus::Pending));
        assert!(!ShipmentStatus::Pending.can_transition_to(&ShipmentStatus::Pending));
    }

    #[test]
    fn cancellation_reachable_from_any_non_terminal_state() {
        assert!(ShipmentStatus::Pending.can_transition_to(&ShipmentStatus::Cancelled));
        assert!(ShipmentStatus::Dispatched.can_transition_to(&ShipmentStatus::Cancelled));
        assert!(ShipmentStatus::InTransit.can_transition_to(&ShipmentStatus::Cancelled));
        assert!(
            ShipmentStatus::Unknown("held".into()).can_transition_to(&ShipmentStatus::Cancelled)
        );

        // Terminal states stay terminal; repeated cancel is rejected.
        assert!(!ShipmentStatus::Cancelled.can_transition_to(&ShipmentStatus::Cancelled));
        assert!(!ShipmentStatus::Delivered.can_transition_to(&ShipmentStatus::Cancelled));
    }

    #[test]
    fn unknown_states_cannot_advance() {
        let held = ShipmentStatus::Unknown("held".into());
        assert!(!held.can_transition_to(&ShipmentStatus::Dispatched));
        assert!(!held.can_transition_to(&ShipmentStatus::Delivered));
        assert!(!held.is_terminal());
    }
}
