//! End-to-end tests over a real listener: REST mutations on one side,
//! WebSocket event delivery on the other.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use greenroom_server::config::{Config, SessionEntry};
use greenroom_server::server::LobbyServer;
use greenroom_server::websocket;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message as WsMessage;

const GAME: &str = "11111111-1111-1111-1111-111111111111";

fn session(token: &str, user: &str, name: &str) -> SessionEntry {
    SessionEntry {
        token: token.to_string(),
        user_id: user.to_string(),
        display_name: name.to_string(),
    }
}

async fn spawn_server() -> (SocketAddr, Arc<LobbyServer>) {
    let mut config = Config::default();
    config.sessions = vec![
        session("t1", "u1", "One"),
        session("t2", "u2", "Two"),
        session("t3", "u3", "Three"),
    ];

    let server = LobbyServer::new(config);
    let app = websocket::create_router("*").with_state(server.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app.into_make_service()).await {
            eprintln!("test server failed: {err}");
        }
    });

    (addr, server)
}

/// Read WebSocket frames until a non-ping event arrives.
async fn next_event<S>(stream: &mut S) -> serde_json::Value
where
    S: StreamExt<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("event within deadline")
            .expect("stream open")
            .expect("frame ok");
        if let WsMessage::Text(text) = frame {
            let value: serde_json::Value = serde_json::from_str(&text).expect("valid json");
            if value["type"] != "ping" {
                return value;
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn lobby_flow_end_to_end() {
    let (addr, _server) = spawn_server().await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}/v1/games/{GAME}");

    // Create a lobby over REST.
    let created: serde_json::Value = client
        .post(format!("{base}/lobbies"))
        .bearer_auth("t1")
        .json(&serde_json::json!({
            "maxPlayers": 4,
            "properties": {"Name": "Friday Night"}
        }))
        .send()
        .await
        .expect("create request")
        .error_for_status()
        .expect("create ok")
        .json()
        .await
        .expect("create body");

    let lobby_id = created["lobbyId"].as_str().expect("lobbyId").to_string();
    assert_eq!(created["ownerUserId"], "u1");
    assert_eq!(created["isOwner"], true);
    assert_eq!(created["name"], "Friday Night");
    assert_eq!(created["lobbyCode"].as_str().expect("code").len(), 6);

    // Subscribe to the event channel as the owner.
    let ws_url = format!("ws://{addr}/v1/games/{GAME}/lobbies/{lobby_id}/events?token=t1");
    let (mut ws, _) = connect_async(&ws_url).await.expect("ws connect");

    // Another player joins; the subscriber sees it.
    let joined: serde_json::Value = client
        .post(format!("{base}/lobbies/{lobby_id}/join"))
        .bearer_auth("t2")
        .send()
        .await
        .expect("join request")
        .error_for_status()
        .expect("join ok")
        .json()
        .await
        .expect("join body");
    assert_eq!(joined["isOwner"], false);
    assert_eq!(joined["members"].as_array().expect("members").len(), 2);

    let event = next_event(&mut ws).await;
    assert_eq!(event["type"], "member_joined");
    assert_eq!(event["userId"], "u2");
    assert_eq!(event["displayName"], "Two");

    // Answer a heartbeat the way a client SDK would.
    ws.send(WsMessage::Text("pong".into())).await.expect("pong");

    // Owner writes lobby data; the event carries the sanitized pair.
    client
        .put(format!("{base}/lobbies/{lobby_id}/data"))
        .bearer_auth("t1")
        .json(&serde_json::json!({"key": "Map", "value": "canyon"}))
        .send()
        .await
        .expect("set data")
        .error_for_status()
        .expect("set data ok");

    let event = next_event(&mut ws).await;
    assert_eq!(event["type"], "lobby_data");
    assert_eq!(event["key"], "Map");
    assert_eq!(event["value"], "canyon");

    // Reads require no auth.
    let data: serde_json::Value = client
        .get(format!("{base}/lobbies/{lobby_id}/data/map"))
        .send()
        .await
        .expect("get data")
        .json()
        .await
        .expect("data body");
    assert_eq!(data["value"], "canyon");

    let members: serde_json::Value = client
        .get(format!("{base}/lobbies/{lobby_id}/members"))
        .send()
        .await
        .expect("get members")
        .json()
        .await
        .expect("members body");
    assert_eq!(members.as_array().expect("array").len(), 2);

    // The open lobby is searchable.
    let found: serde_json::Value = client
        .post(format!("{base}/lobbies/search"))
        .json(&serde_json::json!({"maxRooms": 10, "filters": {"map": "CANYON"}}))
        .send()
        .await
        .expect("search")
        .json()
        .await
        .expect("search body");
    assert_eq!(found.as_array().expect("array").len(), 1);

    // Start locks the lobby down.
    client
        .post(format!("{base}/lobbies/{lobby_id}/start"))
        .bearer_auth("t1")
        .send()
        .await
        .expect("start")
        .error_for_status()
        .expect("start ok");

    let event = next_event(&mut ws).await;
    assert_eq!(event["type"], "lobby_started");

    let late_join = client
        .post(format!("{base}/lobbies/{lobby_id}/join"))
        .bearer_auth("t3")
        .send()
        .await
        .expect("late join");
    assert_eq!(late_join.status(), reqwest::StatusCode::NOT_FOUND);

    // Stats reflect the world.
    let stats: serde_json::Value = client
        .get(format!("http://{addr}/v1/stats/lobbies"))
        .send()
        .await
        .expect("stats")
        .json()
        .await
        .expect("stats body");
    assert_eq!(stats["count"], 1);

    let players: serde_json::Value = client
        .get(format!("{base}/stats/players"))
        .send()
        .await
        .expect("players")
        .json()
        .await
        .expect("players body");
    assert_eq!(players.as_array().expect("array").len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn bad_websocket_token_gets_policy_violation_close() {
    let (addr, server) = spawn_server().await;
    let client = reqwest::Client::new();

    let created: serde_json::Value = client
        .post(format!("http://{addr}/v1/games/{GAME}/lobbies"))
        .bearer_auth("t1")
        .send()
        .await
        .expect("create")
        .json()
        .await
        .expect("body");
    let lobby_id = created["lobbyId"].as_str().expect("lobbyId").to_string();

    let ws_url = format!("ws://{addr}/v1/games/{GAME}/lobbies/{lobby_id}/events?token=wrong");
    let (mut ws, _) = connect_async(&ws_url).await.expect("ws connect");

    let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("close within deadline")
        .expect("stream open")
        .expect("frame ok");
    match frame {
        WsMessage::Close(Some(close)) => assert_eq!(close.code, CloseCode::Policy),
        other => panic!("expected close frame, got {other:?}"),
    }

    // No subscriber was admitted.
    let lobby_uuid = lobby_id.parse().expect("uuid");
    assert_eq!(server.hub().subscriber_count(GAME, lobby_uuid), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn last_leave_tears_down_and_notifies_subscribers() {
    let (addr, _server) = spawn_server().await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}/v1/games/{GAME}");

    let created: serde_json::Value = client
        .post(format!("{base}/lobbies"))
        .bearer_auth("t1")
        .send()
        .await
        .expect("create")
        .json()
        .await
        .expect("body");
    let lobby_id = created["lobbyId"].as_str().expect("lobbyId").to_string();

    let ws_url = format!("ws://{addr}/v1/games/{GAME}/lobbies/{lobby_id}/events?token=t1");
    let (mut ws, _) = connect_async(&ws_url).await.expect("ws connect");

    client
        .post(format!("{base}/leave"))
        .bearer_auth("t1")
        .send()
        .await
        .expect("leave")
        .error_for_status()
        .expect("leave ok");

    let event = next_event(&mut ws).await;
    assert_eq!(event["type"], "lobby_empty");
    let event = next_event(&mut ws).await;
    assert_eq!(event["type"], "lobby_deleted");
    assert_eq!(event["gameId"], GAME);

    // The server closes the channel after the farewell.
    let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("close within deadline")
        .expect("stream open")
        .expect("frame ok");
    assert!(matches!(frame, WsMessage::Close(_)));

    let lobbies: serde_json::Value = client
        .get(format!("http://{addr}/v1/stats/lobbies"))
        .send()
        .await
        .expect("stats")
        .json()
        .await
        .expect("stats body");
    assert_eq!(lobbies["count"], 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn rest_surface_maps_error_kinds() {
    let (addr, _server) = spawn_server().await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}/v1/games/{GAME}");

    // Missing bearer token
    let response = client
        .post(format!("{base}/lobbies"))
        .send()
        .await
        .expect("no auth");
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    // Unknown token
    let response = client
        .post(format!("{base}/lobbies"))
        .bearer_auth("nope")
        .send()
        .await
        .expect("bad auth");
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    // Owner-gated op by a non-owner
    let created: serde_json::Value = client
        .post(format!("{base}/lobbies"))
        .bearer_auth("t1")
        .send()
        .await
        .expect("create")
        .json()
        .await
        .expect("body");
    let lobby_id = created["lobbyId"].as_str().expect("lobbyId").to_string();
    client
        .post(format!("{base}/lobbies/{lobby_id}/join"))
        .bearer_auth("t2")
        .send()
        .await
        .expect("join")
        .error_for_status()
        .expect("join ok");

    let response = client
        .post(format!("{base}/lobbies/{lobby_id}/start"))
        .bearer_auth("t2")
        .send()
        .await
        .expect("non-owner start");
    assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json().await.expect("error body");
    assert_eq!(body["code"], "forbidden");

    // Leaving a lobby you are not in is a conflict-style false
    let response = client
        .post(format!("{base}/lobbies/{lobby_id}/leave"))
        .bearer_auth("t3")
        .send()
        .await
        .expect("not a member");
    assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);

    // Unknown lobby
    let response = client
        .get(format!(
            "{base}/lobbies/00000000-0000-0000-0000-000000000000"
        ))
        .bearer_auth("t1")
        .send()
        .await
        .expect("unknown lobby");
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}
