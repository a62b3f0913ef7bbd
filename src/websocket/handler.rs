use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::server::LobbyServer;

use super::connection::handle_socket;

/// Bearer token carried in the query string: browser WebSocket clients
/// cannot set request headers.
#[derive(Debug, Deserialize)]
pub struct SubscribeQuery {
    pub token: Option<String>,
}

/// Upgrade handler for the lobby event channel.
///
/// The token is validated after the upgrade so a bad session gets a proper
/// policy-violation close frame instead of an opaque HTTP error.
pub async fn subscribe_handler(
    State(server): State<Arc<LobbyServer>>,
    Path((game_id, lobby_id)): Path<(String, Uuid)>,
    Query(query): Query<SubscribeQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, server, game_id, lobby_id, query.token))
}
