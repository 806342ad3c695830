use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the services after their transaction commits.
///
/// The realtime hub is fed directly by the owning service; this channel is
/// the process-internal stream for logging and follow-on automation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Shipment events
    ShipmentCreated(Uuid),
    ShipmentStatusChanged {
        shipment_id: Uuid,
        old_status: String,
        new_status: String,
        tracking_number: String,
    },
    ShipmentLocationUpdated {
        shipment_id: Uuid,
        latitude: f64,
        longitude: f64,
    },

    // Inventory events
    InventoryReserved {
        product_id: Uuid,
        location_id: Uuid,
        quantity: i32,
    },
    InventoryReleased {
        product_id: Uuid,
        location_id: Uuid,
        quantity: i32,
    },
    InventoryTransferred {
        product_id: Uuid,
        from_location_id: Uuid,
        to_location_id: Uuid,
        quantity: i32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel for the lifetime of the process.
///
/// Spawned once by the composition root.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        match &event {
            Event::ShipmentCreated(id) => {
                info!(shipment_id = %id, "Shipment created");
            }
            Event::ShipmentStatusChanged {
                shipment_id,
                old_status,
                new_status,
                tracking_number,
            } => {
                info!(
                    shipment_id = %shipment_id,
                    tracking_number = %tracking_number,
                    old_status = %old_status,
                    new_status = %new_status,
                    "Shipment status changed"
                );
            }
            Event::ShipmentLocationUpdated {
                shipment_id,
                latitude,
                longitude,
            } => {
                info!(
                    shipment_id = %shipment_id,
                    latitude = %latitude,
                    longitude = %longitude,
                    "Shipment location updated"
                );
            }
            Event::InventoryReserved {
                product_id,
                location_id,
                quantity,
            } => {
                info!(
                    product_id = %product_id,
                    location_id = %location_id,
                    quantity = %quantity,
                    "Inventory reserved"
                );
            }
            Event::InventoryReleased {
                product_id,
                location_id,
                quantity,
            } => {
                info!(
                    product_id = %product_id,
                    location_id = %location_id,
                    quantity = %quantity,
                    "Inventory reservation released"
                );
            }
            Event::InventoryTransferred {
                product_id,
                from_location_id,
                to_location_id,
                quantity,
            } => {
                info!(
                    product_id = %product_id,
                    from_location_id = %from_location_id,
                    to_location_id = %to_location_id,
                    quantity = %quantity,
                    "Inventory transferred"
                );
            }
        }
    }

    warn!("Event channel closed; event processor exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        drop(rx);

        let result = sender.send(Event::ShipmentCreated(Uuid::new_v4())).await;
        assert!(result.is_err());
    }
}
