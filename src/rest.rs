//! HTTP request surface.
//!
//! Thin translation onto the engine: extract the bearer token, call the
//! operation, map the result. All semantics live in
//! [`crate::engine::LobbyEngine`].

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::engine::LobbyError;
use crate::protocol::types::{LobbyView, MemberView};
use crate::server::LobbyServer;

/// JSON error body: `{"error": "...", "code": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }
}

impl From<LobbyError> for ApiError {
    fn from(err: LobbyError) -> Self {
        let status = match &err {
            LobbyError::Invalid(_) => StatusCode::BAD_REQUEST,
            LobbyError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            LobbyError::Forbidden => StatusCode::FORBIDDEN,
            LobbyError::NotFound => StatusCode::NOT_FOUND,
            LobbyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
            "code": self.code,
        });
        (self.status, Json(body)).into_response()
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateLobbyRequest {
    pub max_players: u32,
    pub properties: HashMap<String, String>,
}

impl Default for CreateLobbyRequest {
    fn default() -> Self {
        Self {
            max_players: 8,
            properties: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    pub max_rooms: usize,
    pub filters: HashMap<String, String>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            max_rooms: crate::protocol::MAX_SEARCH_RESULTS,
            filters: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetReadyRequest {
    pub is_ready: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetDataRequest {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct Ack {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

fn ack(outcome: bool, denial: &str) -> Result<Json<Ack>, ApiError> {
    if outcome {
        Ok(Json(Ack { ok: true }))
    } else {
        Err(ApiError::conflict(denial))
    }
}

pub async fn create_lobby(
    State(server): State<Arc<LobbyServer>>,
    Path(game_id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<CreateLobbyRequest>>,
) -> Result<Json<LobbyView>, ApiError> {
    let token = bearer_token(&headers)?;
    let Json(body) = body.unwrap_or_default();
    let properties: Vec<(String, String)> = body.properties.into_iter().collect();
    let view = server
        .engine()
        .create_lobby(&game_id, &token, body.max_players, properties)
        .await?;
    Ok(Json(view))
}

pub async fn join_lobby(
    State(server): State<Arc<LobbyServer>>,
    Path((game_id, lobby_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<LobbyView>, ApiError> {
    let token = bearer_token(&headers)?;
    let view = server.engine().join_lobby(&game_id, lobby_id, &token).await?;
    Ok(Json(view))
}

pub async fn leave_lobby(
    State(server): State<Arc<LobbyServer>>,
    Path((game_id, lobby_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<Ack>, ApiError> {
    let token = bearer_token(&headers)?;
    let left = server.engine().leave_lobby(&game_id, lobby_id, &token).await?;
    ack(left, "Not a member of this lobby")
}

pub async fn leave_by_token(
    State(server): State<Arc<LobbyServer>>,
    Path(game_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Ack>, ApiError> {
    let token = bearer_token(&headers)?;
    let left = server.engine().leave_lobby_by_token(&game_id, &token).await?;
    ack(left, "Not a member of any lobby in this game")
}

pub async fn get_lobby(
    State(server): State<Arc<LobbyServer>>,
    Path((game_id, lobby_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<LobbyView>, ApiError> {
    let token = bearer_token(&headers)?;
    let view = server.engine().get_lobby(&game_id, lobby_id, &token)?;
    Ok(Json(view))
}

pub async fn get_members(
    State(server): State<Arc<LobbyServer>>,
    Path((game_id, lobby_id)): Path<(String, Uuid)>,
) -> Json<Vec<MemberView>> {
    Json(server.engine().lobby_member_views(&game_id, lobby_id))
}

pub async fn search_lobbies(
    State(server): State<Arc<LobbyServer>>,
    Path(game_id): Path<String>,
    body: Option<Json<SearchRequest>>,
) -> Json<Vec<LobbyView>> {
    let Json(body) = body.unwrap_or_default();
    let filters: Vec<(String, String)> = body.filters.into_iter().collect();
    Json(
        server
            .engine()
            .search_lobbies(&game_id, body.max_rooms, &filters),
    )
}

pub async fn set_ready(
    State(server): State<Arc<LobbyServer>>,
    Path((game_id, lobby_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
    Json(body): Json<SetReadyRequest>,
) -> Result<Json<Ack>, ApiError> {
    let token = bearer_token(&headers)?;
    let updated = server
        .engine()
        .set_ready(&game_id, lobby_id, &token, body.is_ready)
        .await?;
    ack(updated, "Ready state cannot be changed")
}

pub async fn set_everyone_ready(
    State(server): State<Arc<LobbyServer>>,
    Path((game_id, lobby_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<Ack>, ApiError> {
    let token = bearer_token(&headers)?;
    let updated = server
        .engine()
        .set_everyone_ready(&game_id, lobby_id, &token)
        .await?;
    ack(updated, "Ready state cannot be changed")
}

pub async fn set_data(
    State(server): State<Arc<LobbyServer>>,
    Path((game_id, lobby_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
    Json(body): Json<SetDataRequest>,
) -> Result<Json<Ack>, ApiError> {
    let token = bearer_token(&headers)?;
    let written = server
        .engine()
        .set_lobby_data(&game_id, lobby_id, &token, &body.key, &body.value)
        .await?;
    ack(written, "Lobby property limit reached")
}

pub async fn get_data(
    State(server): State<Arc<LobbyServer>>,
    Path((game_id, lobby_id, key)): Path<(String, Uuid, String)>,
) -> Result<Json<DataResponse>, ApiError> {
    match server.engine().get_lobby_data(&game_id, lobby_id, &key) {
        Some(value) => Ok(Json(DataResponse { key, value })),
        None => Err(ApiError::not_found("No such lobby property")),
    }
}

pub async fn start_lobby(
    State(server): State<Arc<LobbyServer>>,
    Path((game_id, lobby_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<Ack>, ApiError> {
    let token = bearer_token(&headers)?;
    let started = server.engine().start_lobby(&game_id, lobby_id, &token).await?;
    ack(started, "Lobby already started")
}

pub async fn global_players(State(server): State<Arc<LobbyServer>>) -> Json<CountResponse> {
    Json(CountResponse {
        count: server.engine().global_player_count(),
    })
}

pub async fn global_lobbies(State(server): State<Arc<LobbyServer>>) -> Json<CountResponse> {
    Json(CountResponse {
        count: server.engine().global_lobby_count(),
    })
}

pub async fn game_lobbies(
    State(server): State<Arc<LobbyServer>>,
    Path(game_id): Path<String>,
) -> Json<CountResponse> {
    Json(CountResponse {
        count: server.engine().lobby_count_by_game(&game_id),
    })
}

pub async fn game_players(
    State(server): State<Arc<LobbyServer>>,
    Path(game_id): Path<String>,
) -> Json<Vec<MemberView>> {
    Json(server.engine().active_players_by_game(&game_id))
}
