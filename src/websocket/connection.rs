use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::hub::{is_heartbeat_response, SubscriberCommand, CLOSE_POLICY_VIOLATION};
use crate::protocol::types::LobbyId;
use crate::server::LobbyServer;

/// Per-connection driver for the lobby event channel.
///
/// The hub talks to this connection exclusively through the command
/// channel: `Deliver` becomes a text frame, `Close` becomes a close frame.
/// Inbound traffic only matters as heartbeat responses; everything else is
/// left to higher layers.
pub(super) async fn handle_socket(
    socket: WebSocket,
    server: Arc<LobbyServer>,
    game_id: String,
    lobby_id: LobbyId,
    token: Option<String>,
) {
    let (mut sender, mut receiver) = socket.split();

    let Some(token) = token.filter(|t| !t.is_empty()) else {
        tracing::warn!(%lobby_id, game_id, "Subscriber connected without a token");
        close_with_policy_violation(&mut sender, "missing session token").await;
        return;
    };

    let identity = match server.validator().validate(&token).await {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!(%lobby_id, game_id, error = %err, "Rejecting subscriber with bad token");
            close_with_policy_violation(&mut sender, "invalid session token").await;
            return;
        }
    };

    let (tx, mut rx) = mpsc::channel::<SubscriberCommand>(64);
    let subscriber = server
        .hub()
        .subscribe(&game_id, lobby_id, token, identity.user_id, tx);
    let subscriber_id = subscriber.id();

    // Outgoing: drain hub commands onto the socket.
    let send_task = tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            match command {
                SubscriberCommand::Deliver(payload) => {
                    if sender
                        .send(Message::Text(payload.as_ref().into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                SubscriberCommand::Close(code) => {
                    let _ = sender
                        .send(Message::Close(Some(CloseFrame {
                            code,
                            reason: "".into(),
                        })))
                        .await;
                    break;
                }
            }
        }
        let _ = sender.close().await;
    });

    // Incoming: count heartbeat responses, ignore the rest.
    let liveness = subscriber.clone();
    let receive_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    if is_heartbeat_response(&text) {
                        liveness.record_heartbeat();
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {
                    // Binary and control frames are not part of the
                    // subscriber protocol.
                }
                Err(err) => {
                    tracing::debug!(error = %err, "Subscriber socket read failed");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = send_task => {}
        _ = receive_task => {}
    }

    server.hub().unsubscribe(&game_id, lobby_id, subscriber_id);
    tracing::debug!(%lobby_id, game_id, subscriber_id = %subscriber_id, "Subscriber connection closed");
}

async fn close_with_policy_violation(
    sender: &mut (impl futures_util::Sink<Message> + Unpin),
    reason: &'static str,
) {
    let _ = sender
        .send(Message::Close(Some(CloseFrame {
            code: CLOSE_POLICY_VIOLATION,
            reason: reason.into(),
        })))
        .await;
    let _ = sender.close().await;
}
