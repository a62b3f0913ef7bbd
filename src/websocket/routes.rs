use axum::extract::State;
use axum::routing::{get, post, put};
use std::sync::Arc;

use crate::rest;
use crate::server::LobbyServer;

use super::handler::subscribe_handler;

/// Create the Axum router: REST surface, WebSocket event channel, health.
pub fn create_router(cors_origins: &str) -> axum::Router<Arc<LobbyServer>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    axum::Router::new()
        .route("/health", get(health_check))
        .route("/v1/stats/players", get(rest::global_players))
        .route("/v1/stats/lobbies", get(rest::global_lobbies))
        .route("/v1/games/{game_id}/stats/players", get(rest::game_players))
        .route("/v1/games/{game_id}/stats/lobbies", get(rest::game_lobbies))
        .route("/v1/games/{game_id}/lobbies", post(rest::create_lobby))
        .route(
            "/v1/games/{game_id}/lobbies/search",
            post(rest::search_lobbies),
        )
        .route("/v1/games/{game_id}/leave", post(rest::leave_by_token))
        .route("/v1/games/{game_id}/lobbies/{lobby_id}", get(rest::get_lobby))
        .route(
            "/v1/games/{game_id}/lobbies/{lobby_id}/join",
            post(rest::join_lobby),
        )
        .route(
            "/v1/games/{game_id}/lobbies/{lobby_id}/leave",
            post(rest::leave_lobby),
        )
        .route(
            "/v1/games/{game_id}/lobbies/{lobby_id}/members",
            get(rest::get_members),
        )
        .route(
            "/v1/games/{game_id}/lobbies/{lobby_id}/ready",
            post(rest::set_ready),
        )
        .route(
            "/v1/games/{game_id}/lobbies/{lobby_id}/everyone-ready",
            post(rest::set_everyone_ready),
        )
        .route(
            "/v1/games/{game_id}/lobbies/{lobby_id}/data",
            put(rest::set_data),
        )
        .route(
            "/v1/games/{game_id}/lobbies/{lobby_id}/data/{key}",
            get(rest::get_data),
        )
        .route(
            "/v1/games/{game_id}/lobbies/{lobby_id}/start",
            post(rest::start_lobby),
        )
        .route(
            "/v1/games/{game_id}/lobbies/{lobby_id}/events",
            get(subscribe_handler),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
async fn health_check(
    State(server): State<Arc<LobbyServer>>,
) -> axum::response::Result<&'static str> {
    if server.health_check() {
        Ok("OK")
    } else {
        Err(axum::http::StatusCode::SERVICE_UNAVAILABLE.into())
    }
}
