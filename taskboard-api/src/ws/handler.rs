use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use taskboard_shared::auth::middleware::{authenticate_token, AuthContext, AuthError};
use taskboard_shared::error::ServiceError;
use taskboard_shared::events::Room;
use taskboard_shared::services::{accounts, parse_id, projects};
use taskboard_shared::store::Store;

use crate::app::AppState;
use crate::error::ApiResult;
use crate::ws::hub::Hub;

/// Upgrade query string
#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Client-to-server commands
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
enum ClientMessage {
    /// Subscribe to the caller's own notification room
    Join(String),
    JoinProject(String),
    LeaveProject(String),
}

/// HTTP handler that authenticates and upgrades the connection.
///
/// The bearer token travels in the query string because browsers cannot set
/// headers on a WebSocket handshake. Authentication failures are answered
/// with the usual JSON error before any upgrade happens.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    let token = params
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or(AuthError::MissingToken)?;
    let (auth, _) = authenticate_token(state.store.as_ref(), state.tokens.secret(), token.trim()).await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state.store, state.hub, auth)))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Registers the connection, joins the user's room, spawns a sender task
/// that forwards hub messages to the sink, and processes inbound commands
/// until the client goes away.
async fn handle_socket(socket: WebSocket, store: Arc<dyn Store>, hub: Arc<Hub>, auth: AuthContext) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, user_id = %auth.user_id, "WebSocket connected");

    let mut rx = hub.add(conn_id.clone(), auth.user_id).await;
    hub.join(&conn_id, Room::User(auth.user_id)).await;

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if let Err(message) = handle_command(store.as_ref(), &hub, &conn_id, &auth, &text).await {
                    hub.send_to(&conn_id, error_frame(&message)).await;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    hub.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

/// Applies one client command; the error string is sent back to the client.
///
/// Project joins re-check the access policy against the current user record
/// and project, so a socket cannot subscribe to a project it was removed from.
/// Sockets already in the room are evicted by the hub when the project
/// broadcasts `projectAccessRevoked`.
pub(crate) async fn handle_command(
    store: &dyn Store,
    hub: &Hub,
    conn_id: &str,
    auth: &AuthContext,
    text: &str,
) -> Result<(), String> {
    let command: ClientMessage =
        serde_json::from_str(text).map_err(|_| "Unrecognized message".to_string())?;

    match command {
        ClientMessage::Join(raw) => {
            let user_id = parse_id(&raw, "user").map_err(|e| e.to_string())?;
            if user_id != auth.user_id {
                tracing::warn!(conn_id = %conn_id, user_id = %auth.user_id, "Rejected join of another user's room");
                return Err("Cannot join another user's room".to_string());
            }
            hub.join(conn_id, Room::User(user_id)).await;
        }
        ClientMessage::JoinProject(raw) => {
            let project_id = parse_id(&raw, "project").map_err(|e| e.to_string())?;
            let user = accounts::me(store, auth).await.map_err(client_message)?;
            projects::get(store, &AuthContext::from_user(&user), project_id)
                .await
                .map_err(client_message)?;

            hub.join(conn_id, Room::Project(project_id)).await;
            tracing::debug!(conn_id = %conn_id, project_id = %project_id, "Joined project room");
        }
        ClientMessage::LeaveProject(raw) => {
            let project_id = parse_id(&raw, "project").map_err(|e| e.to_string())?;
            hub.leave(conn_id, Room::Project(project_id)).await;
        }
    }

    Ok(())
}

fn client_message(err: ServiceError) -> String {
    match err {
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "Store error during room join");
            "An internal error occurred".to_string()
        }
        other => other.to_string(),
    }
}

fn error_frame(message: &str) -> Message {
    Message::Text(json!({ "event": "error", "data": { "message": message } }).to_string())
}
