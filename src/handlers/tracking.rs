use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::location_update,
    realtime::{protocol, ClientMessage, ServerMessage},
    services::location_tracking::LocationReport,
    ApiResponse, ApiResult, AppState,
};

/// Upgrades the realtime tracking channel.
///
/// Each connection gets a fresh client id; the socket speaks the JSON
/// protocol defined in [`crate::realtime::protocol`].
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let client_id = state.hub.connect(tx);

    // Writer task: owns the outbound half. The hub only ever touches the
    // channel, so a slow socket backs up here and nowhere else.
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to encode server message: {}", e);
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = ws_rx.next().await {
        match frame {
            Message::Text(text) => match protocol::parse_client_message(&text) {
                Ok(ClientMessage::Ping) => {
                    state.hub.send_to(client_id, ServerMessage::Pong);
                }
                Ok(ClientMessage::Subscribe { shipment_id }) => {
                    if let Err(e) = state.hub.subscribe(client_id, shipment_id).await {
                        warn!(client_id = %client_id, "Subscribe failed: {}", e);
                        state.hub.send_to(
                            client_id,
                            ServerMessage::Error {
                                message: "Subscription failed".to_string(),
                            },
                        );
                    }
                }
                Ok(ClientMessage::Unsubscribe { shipment_id }) => {
                    state.hub.unsubscribe(client_id, shipment_id);
                }
                // Protocol errors are answered on the socket; the
                // connection stays open.
                Err(protocol_error) => {
                    debug!(client_id = %client_id, "Protocol error: {:?}", protocol_error);
                    state.hub.send_to(client_id, protocol_error.into_reply());
                }
            },
            Message::Close(_) => break,
            // Transport-level ping/pong and binary frames are ignored.
            _ => {}
        }
    }

    state.hub.disconnect(client_id);
    writer.abort();
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "latitude": 37.7749,
    "longitude": -122.4194,
    "timestamp": "2025-11-09T10:30:00Z",
    "speed": 65.0,
    "heading": 270.0
}))]
pub struct LocationReportRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    /// When the point was recorded by the reporter
    pub timestamp: DateTime<Utc>,
    /// Speed in km/h, when the reporter provides it
    pub speed: Option<f64>,
    /// Heading in degrees from north
    pub heading: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LocationUpdateSummary {
    pub id: Uuid,
    pub shipment_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
}

impl From<location_update::Model> for LocationUpdateSummary {
    fn from(model: location_update::Model) -> Self {
        Self {
            id: model.id,
            shipment_id: model.shipment_id,
            latitude: model.latitude,
            longitude: model.longitude,
            timestamp: model.timestamp,
            speed: model.speed,
            heading: model.heading,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/{id}/location",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = LocationReportRequest,
    responses(
        (status = 200, description = "Location recorded", body = ApiResponse<LocationUpdateSummary>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "tracking"
)]
pub async fn report_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LocationReportRequest>,
) -> ApiResult<LocationUpdateSummary> {
    payload.validate()?;

    let model = state
        .services
        .location_tracking
        .record_update(
            id,
            LocationReport {
                latitude: payload.latitude,
                longitude: payload.longitude,
                timestamp: payload.timestamp,
                speed: payload.speed,
                heading: payload.heading,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(LocationUpdateSummary::from(
        model,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments/{id}/locations",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Location history", body = ApiResponse<Vec<LocationUpdateSummary>>)
    ),
    tag = "tracking"
)]
pub async fn location_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<LocationUpdateSummary>> {
    let updates = state.services.location_tracking.history(id).await?;
    let items: Vec<LocationUpdateSummary> = updates
        .into_iter()
        .map(LocationUpdateSummary::from)
        .collect();

    Ok(Json(ApiResponse::success(items)))
}
