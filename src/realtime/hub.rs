use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use sea_orm::{DatabaseConnection, EntityTrait};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::entities::shipment::Entity as ShipmentEntity;
use crate::errors::ServiceError;
use crate::realtime::protocol::ServerMessage;

/// Outbound channel for one live connection. The websocket writer task owns
/// the receiving end, so a slow client never blocks the hub.
pub type ConnectionSender = mpsc::UnboundedSender<ServerMessage>;

struct ConnectionEntry {
    sender: ConnectionSender,
    topics: HashSet<Uuid>,
}

/// The two inverse indices. Only ever touched with the registry lock held;
/// every mutation updates both sides so they cannot diverge.
#[derive(Default)]
struct Registry {
    connections: HashMap<Uuid, ConnectionEntry>,
    subscribers: HashMap<Uuid, HashSet<Uuid>>,
}

impl Registry {
    fn remove_connection(&mut self, connection_id: Uuid) -> bool {
        let Some(entry) = self.connections.remove(&connection_id) else {
            return false;
        };
        for topic in entry.topics {
            if let Some(subs) = self.subscribers.get_mut(&topic) {
                subs.remove(&connection_id);
                if subs.is_empty() {
                    self.subscribers.remove(&topic);
                }
            }
        }
        true
    }
}

/// Tracks live client connections and their shipment subscriptions, and
/// fans published messages out to the current subscriber set.
///
/// Constructed once by the composition root and handed to everything that
/// publishes. Subscription state is process-local and starts empty on every
/// restart.
pub struct RealtimeHub {
    db: Arc<DatabaseConnection>,
    registry: Mutex<Registry>,
}

impl RealtimeHub {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            registry: Mutex::new(Registry::default()),
        }
    }

    fn registry_guard(&self) -> std::sync::MutexGuard<'_, Registry> {
        // A poisoned lock only means another thread panicked mid-mutation of
        // volatile state; recover the guard rather than cascading the panic.
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a new connection and greets it.
    pub fn connect(&self, sender: ConnectionSender) -> Uuid {
        let connection_id = Uuid::new_v4();
        {
            let mut registry = self.registry_guard();
            registry.connections.insert(
                connection_id,
                ConnectionEntry {
                    sender: sender.clone(),
                    topics: HashSet::new(),
                },
            );
        }

        info!(client_id = %connection_id, "Realtime client connected");

        let welcome = ServerMessage::Welcome {
            client_id: connection_id,
            message: "Connected to ShipTrack real-time tracking".to_string(),
        };
        if sender.send(welcome).is_err() {
            self.disconnect(connection_id);
        }

        connection_id
    }

    /// Sends a message to one connection. A dead peer is cleaned up here
    /// rather than surfaced to the caller.
    pub fn send_to(&self, connection_id: Uuid, message: ServerMessage) {
        let sender = {
            let registry = self.registry_guard();
            registry
                .connections
                .get(&connection_id)
                .map(|entry| entry.sender.clone())
        };

        if let Some(sender) = sender {
            if sender.send(message).is_err() {
                self.disconnect(connection_id);
            }
        }
    }

    /// Subscribes a connection to a shipment's topic.
    ///
    /// The shipment must exist; on a miss the caller gets an error reply on
    /// its socket and the registry is left untouched.
    #[instrument(skip(self))]
    pub async fn subscribe(
        &self,
        connection_id: Uuid,
        shipment_id: Uuid,
    ) -> Result<bool, ServiceError> {
        // Validate before taking the lock; the lookup is read-only.
        let shipment = ShipmentEntity::find_by_id(shipment_id)
            .one(&*self.db)
            .await?;

        let Some(shipment) = shipment else {
            self.send_to(
                connection_id,
                ServerMessage::Error {
                    message: "Shipment not found".to_string(),
                },
            );
            return Ok(false);
        };

        let registered = {
            let mut registry = self.registry_guard();
            match registry.connections.get_mut(&connection_id) {
                Some(entry) => {
                    entry.topics.insert(shipment_id);
                    registry
                        .subscribers
                        .entry(shipment_id)
                        .or_default()
                        .insert(connection_id);
                    true
                }
                // Connection dropped while the lookup was in flight.
                None => false,
            }
        };

        if !registered {
            return Ok(false);
        }

        self.send_to(
            connection_id,
            ServerMessage::Subscribed {
                shipment_id,
                tracking_number: shipment.tracking_number,
            },
        );
        debug!(client_id = %connection_id, shipment_id = %shipment_id, "Subscribed");
        Ok(true)
    }

    /// Removes a subscription. Idempotent: unsubscribing from a topic the
    /// connection never followed still acknowledges.
    pub fn unsubscribe(&self, connection_id: Uuid, shipment_id: Uuid) {
        {
            let mut registry = self.registry_guard();
            if let Some(subs) = registry.subscribers.get_mut(&shipment_id) {
                subs.remove(&connection_id);
                if subs.is_empty() {
                    registry.subscribers.remove(&shipment_id);
                }
            }
            if let Some(entry) = registry.connections.get_mut(&connection_id) {
                entry.topics.remove(&shipment_id);
            }
        }

        self.send_to(connection_id, ServerMessage::Unsubscribed { shipment_id });
    }

    /// Delivers `message` to every current subscriber of the shipment's
    /// topic. The subscriber set is snapshotted so no send happens under the
    /// registry lock; a failed send disconnects that peer and never blocks
    /// the rest.
    pub fn publish(&self, shipment_id: Uuid, message: ServerMessage) {
        let targets: Vec<(Uuid, ConnectionSender)> = {
            let registry = self.registry_guard();
            match registry.subscribers.get(&shipment_id) {
                Some(subs) => subs
                    .iter()
                    .filter_map(|id| {
                        registry
                            .connections
                            .get(id)
                            .map(|entry| (*id, entry.sender.clone()))
                    })
                    .collect(),
                None => return,
            }
        };

        for (connection_id, sender) in targets {
            if sender.send(message.clone()).is_err() {
                warn!(client_id = %connection_id, "Subscriber send failed; disconnecting");
                self.disconnect(connection_id);
            }
        }
    }

    /// Removes a connection and all of its subscriptions. Safe to call more
    /// than once.
    pub fn disconnect(&self, connection_id: Uuid) {
        let removed = {
            let mut registry = self.registry_guard();
            registry.remove_connection(connection_id)
        };
        if removed {
            info!(client_id = %connection_id, "Realtime client disconnected");
        }
    }

    pub fn connection_count(&self) -> usize {
        self.registry_guard().connections.len()
    }

    pub fn topic_count(&self) -> usize {
        self.registry_guard().subscribers.len()
    }

    pub fn subscriber_count(&self, shipment_id: Uuid) -> usize {
        self.registry_guard()
            .subscribers
            .get(&shipment_id)
            .map(HashSet::len)
            .unwrap_or(0)
    }
}
