//! The WebSocket gateway: the per-connection message boundary.
//!
//! One socket carries the whole game protocol. Inbound JSON messages are
//! dispatched to the room manager or to the connection's current room;
//! outbound frames arrive on a per-connection channel that room actors
//! fan out into.
//!
//! The gateway owns connection bindings and nothing else: it never reads
//! or writes game state, so the projection rule (hole cards only to their
//! owner) is enforced before frames ever reach this module. Error frames
//! generated here are request-scoped and carry state version 0; the
//! version ordering contract applies to state-bearing events only.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use pocket_holdem::game::entities::{ActionRequest, ConnectionId, Nickname, PlayerId};
use pocket_holdem::net::{ClientMessage, Frame, GameError, ServerEvent};
use pocket_holdem::room::actor::SUBSCRIBER_CAPACITY;
use pocket_holdem::room::{RoomCommand, RoomHandle};

use super::AppState;

/// The connection's binding to a room, established by create/join/
/// reconnect and cleared on leave.
struct Session {
    handle: RoomHandle,
    player_id: PlayerId,
}

/// Upgrade to the game protocol WebSocket.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id: ConnectionId = Uuid::new_v4();
    let (socket_tx, mut socket_rx) = socket.split();
    let (frame_tx, frame_rx) = mpsc::channel::<Frame>(SUBSCRIBER_CAPACITY);

    info!(connection = %connection_id, "websocket connected");

    // Outbound pump: serialize frames onto the socket until the
    // connection dies.
    let send_task = tokio::spawn(pump_frames(frame_rx, socket_tx));

    let mut session: Option<Session> = None;
    while let Some(message) = socket_rx.next().await {
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                debug!(connection = %connection_id, "websocket error: {err}");
                break;
            }
        };
        match message {
            Message::Text(text) => {
                handle_text(&state, connection_id, &frame_tx, &mut session, text.as_str()).await;
            }
            Message::Close(_) => break,
            // Pings are answered by axum; binary frames are not part of
            // the protocol.
            _ => {}
        }
    }

    // Disconnection is silent: the player stays in the room and timers
    // keep running. Only the connection binding is cleared.
    if let Some(session) = session {
        let _ = session
            .handle
            .send(RoomCommand::Disconnect { connection_id })
            .await;
    }
    send_task.abort();
    info!(connection = %connection_id, "websocket closed");
}

async fn pump_frames(
    mut frame_rx: mpsc::Receiver<Frame>,
    mut socket_tx: SplitSink<WebSocket, Message>,
) {
    while let Some(frame) = frame_rx.recv().await {
        let text = match serde_json::to_string(&frame) {
            Ok(text) => text,
            Err(err) => {
                warn!("failed to serialize frame: {err}");
                continue;
            }
        };
        if socket_tx.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }
}

async fn handle_text(
    state: &AppState,
    connection_id: ConnectionId,
    frame_tx: &mpsc::Sender<Frame>,
    session: &mut Option<Session>,
    text: &str,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            debug!(connection = %connection_id, "unparseable message: {err}");
            send_error(frame_tx, GameError::BadMessage).await;
            return;
        }
    };

    if let Err(err) = dispatch(state, connection_id, frame_tx, session, message).await {
        send_error(frame_tx, err).await;
    }
}

async fn dispatch(
    state: &AppState,
    connection_id: ConnectionId,
    frame_tx: &mpsc::Sender<Frame>,
    session: &mut Option<Session>,
    message: ClientMessage,
) -> Result<(), GameError> {
    match message {
        ClientMessage::CreateRoom {
            host_nickname,
            config,
        } => {
            detach(session, connection_id).await;
            let (handle, room_id, player_id) = state
                .rooms
                .create_room(
                    Nickname::new(&host_nickname),
                    &config,
                    connection_id,
                    frame_tx.clone(),
                )
                .await?;
            info!(connection = %connection_id, room = %room_id, "room created");
            *session = Some(Session { handle, player_id });
            Ok(())
        }
        ClientMessage::JoinRoom {
            room_id,
            nickname,
            player_id,
        } => {
            detach(session, connection_id).await;
            let (handle, reply) = state
                .rooms
                .join_room(
                    &room_id,
                    Nickname::new(&nickname),
                    connection_id,
                    player_id,
                    frame_tx.clone(),
                )
                .await?;
            info!(
                connection = %connection_id,
                room = %room_id,
                reconnect = reply.is_reconnect,
                "joined room"
            );
            *session = Some(Session {
                handle,
                player_id: reply.player_id,
            });
            Ok(())
        }
        ClientMessage::Reconnect { room_id, player_id } => {
            detach(session, connection_id).await;
            let (handle, reply) = state
                .rooms
                .join_room(
                    &room_id,
                    Nickname::new("reconnecting"),
                    connection_id,
                    Some(player_id),
                    frame_tx.clone(),
                )
                .await?;
            info!(connection = %connection_id, room = %room_id, "reconnected");
            *session = Some(Session {
                handle,
                player_id: reply.player_id,
            });
            Ok(())
        }
        ClientMessage::SitDown { seat_index } => {
            let session = session.as_ref().ok_or(GameError::NotInRoom)?;
            roundtrip(session, |reply| RoomCommand::SitDown {
                player_id: session.player_id,
                seat_index,
                reply,
            })
            .await
        }
        ClientMessage::StandUp => {
            let session = session.as_ref().ok_or(GameError::NotInRoom)?;
            roundtrip(session, |reply| RoomCommand::StandUp {
                player_id: session.player_id,
                reply,
            })
            .await
        }
        ClientMessage::StartGame => {
            let session = session.as_ref().ok_or(GameError::NotInRoom)?;
            roundtrip(session, |reply| RoomCommand::StartGame {
                player_id: session.player_id,
                reply,
            })
            .await
        }
        ClientMessage::PlayerAction {
            action,
            amount,
            round_index,
            request_id,
        } => {
            let session = session.as_ref().ok_or(GameError::NotInRoom)?;
            let request = ActionRequest {
                kind: action,
                amount,
                round_index,
                request_id,
            };
            roundtrip(session, |reply| RoomCommand::Action {
                player_id: session.player_id,
                request,
                reply,
            })
            .await
        }
        ClientMessage::PlayerReady => {
            let session = session.as_ref().ok_or(GameError::NotInRoom)?;
            roundtrip(session, |reply| RoomCommand::Ready {
                player_id: session.player_id,
                reply,
            })
            .await
        }
        ClientMessage::KickPlayer { target_player_id } => {
            let session = session.as_ref().ok_or(GameError::NotInRoom)?;
            roundtrip(session, |reply| RoomCommand::Kick {
                requester: session.player_id,
                target: target_player_id,
                reply,
            })
            .await
        }
        ClientMessage::LeaveRoom => {
            let current = session.take().ok_or(GameError::NotInRoom)?;
            let result = roundtrip(&current, |reply| RoomCommand::Leave {
                player_id: current.player_id,
                reply,
            })
            .await;
            if result.is_err() {
                // Leave was rejected (e.g. seated mid-game); keep the
                // binding.
                *session = Some(current);
            }
            result
        }
    }
}

/// Send a request-scoped command and wait for its verdict.
async fn roundtrip<F>(session: &Session, make: F) -> Result<(), GameError>
where
    F: FnOnce(oneshot::Sender<Result<(), GameError>>) -> RoomCommand,
{
    let (reply_tx, reply_rx) = oneshot::channel();
    session
        .handle
        .send(make(reply_tx))
        .await
        .map_err(|_| GameError::RoomNotFound)?;
    reply_rx.await.map_err(|_| GameError::RoomNotFound)?
}

/// Tell the current room (if any) that this connection is gone before
/// binding to another room.
async fn detach(session: &mut Option<Session>, connection_id: ConnectionId) {
    if let Some(session) = session.take() {
        let _ = session
            .handle
            .send(RoomCommand::Disconnect { connection_id })
            .await;
    }
}

async fn send_error(frame_tx: &mpsc::Sender<Frame>, err: GameError) {
    let frame = Frame {
        state_version: 0,
        event: ServerEvent::from(err),
    };
    let _ = frame_tx.send(frame).await;
}
