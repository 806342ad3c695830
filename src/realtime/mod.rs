//! Real-time shipment tracking: the connection registry and the wire
//! protocol spoken over the tracking WebSocket.

pub mod hub;
pub mod protocol;

pub use hub::RealtimeHub;
pub use protocol::{ClientMessage, ProtocolError, ServerMessage};
