//! Room actor message types.

use tokio::sync::{mpsc, oneshot};

use crate::game::entities::{ActionRequest, ConnectionId, PlayerId, SeatIndex};
use crate::net::errors::GameError;
use crate::net::messages::Frame;

/// Who an outbound frame is addressed to.
#[derive(Clone, Copy, Debug)]
pub enum Recipient {
    /// Every subscribed connection.
    All,
    /// Exactly one connection.
    Connection(ConnectionId),
    /// The connection currently bound to a player, if any.
    Player(PlayerId),
}

/// A version-stamped frame plus its audience. Rooms produce these; the
/// actor fans them out.
#[derive(Clone, Debug)]
pub struct Outgoing {
    pub recipient: Recipient,
    pub frame: Frame,
}

/// Result payload of a join/reconnect.
#[derive(Clone, Copy, Debug)]
pub struct JoinReply {
    pub player_id: PlayerId,
    pub is_reconnect: bool,
}

/// Lightweight room snapshot for diagnostics and listings.
#[derive(Clone, Debug)]
pub struct RoomSummary {
    pub room_id: String,
    pub player_count: usize,
    pub seated_count: usize,
    pub is_playing: bool,
    pub hand_number: u64,
}

/// Commands consumed by a room's serial executor. Replies carry only the
/// request-scoped result; all observable state changes arrive as events on
/// the subscriber channel.
#[derive(Debug)]
pub enum RoomCommand {
    /// Join as a new spectator, or rebind an existing player's connection
    /// when `existing_player_id` matches.
    Join {
        nickname: String,
        connection_id: ConnectionId,
        existing_player_id: Option<PlayerId>,
        subscriber: mpsc::Sender<Frame>,
        reply: oneshot::Sender<Result<JoinReply, GameError>>,
    },
    SitDown {
        player_id: PlayerId,
        seat_index: SeatIndex,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    StandUp {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    StartGame {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Action {
        player_id: PlayerId,
        request: ActionRequest,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Ready {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Kick {
        requester: PlayerId,
        target: PlayerId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    /// The connection dropped. Player state is preserved; timers keep
    /// running.
    Disconnect { connection_id: ConnectionId },
    Summary {
        reply: oneshot::Sender<RoomSummary>,
    },
}
