//! Wire protocol: inbound client messages, outbound events, and the
//! public projections of room state.
//!
//! The projection rule is the load-bearing part of this module: a
//! [`RoomView`] carries only public player fields. Hole cards travel in
//! exactly three places, all scoped to a single connection or to the
//! showdown disclosure: `deal_cards`, the `my_cards` field of
//! `reconnected`/`sync_state`, and `hand_result.showdown_cards`. The deck
//! never leaves the room.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::entities::{
    ActionKind, Card, Chips, GameState, Phase, Player, PlayerId, PlayerStatus, SeatIndex,
};
use crate::game::eval::HandCategory;
use crate::net::errors::GameError;
use crate::room::config::{RoomConfig, RoomOverrides};
use crate::room::state::Room;

/// Messages a client may send over its connection.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom {
        host_nickname: String,
        #[serde(default)]
        config: RoomOverrides,
    },
    JoinRoom {
        room_id: String,
        nickname: String,
        /// Present when rejoining with a stored session.
        #[serde(default)]
        player_id: Option<PlayerId>,
    },
    SitDown {
        seat_index: SeatIndex,
    },
    StandUp,
    StartGame,
    PlayerAction {
        action: ActionKind,
        #[serde(default)]
        amount: Option<Chips>,
        round_index: u32,
        request_id: Uuid,
    },
    PlayerReady,
    KickPlayer {
        target_player_id: PlayerId,
    },
    LeaveRoom,
    Reconnect {
        room_id: String,
        player_id: PlayerId,
    },
}

/// Events the server pushes to clients. Every event is wrapped in a
/// [`Frame`] carrying the room's state version.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    RoomCreated {
        room_id: String,
        player_id: PlayerId,
        room: RoomView,
    },
    RoomJoined {
        room_id: String,
        player_id: PlayerId,
        room: RoomView,
    },
    RoomUpdated {
        room: RoomView,
    },
    PlayerJoined {
        player: PlayerView,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    PlayerSat {
        player_id: PlayerId,
        seat_index: SeatIndex,
    },
    PlayerStood {
        player_id: PlayerId,
    },
    PlayerKicked {
        player_id: PlayerId,
        /// True on the copy delivered to the kicked player.
        should_clear_session: bool,
    },
    HostTransferred {
        new_host_id: PlayerId,
    },
    ReadyStateChanged {
        player_id: PlayerId,
        is_ready: bool,
    },
    GameStarted {
        hand_id: Uuid,
        hand_number: u64,
        room: RoomView,
    },
    /// Full snapshot. `my_cards` is populated only on copies sent to a
    /// single connection.
    SyncState {
        room: RoomView,
        #[serde(skip_serializing_if = "Option::is_none")]
        my_cards: Option<Vec<Card>>,
    },
    /// Private: the recipient's own hole cards.
    DealCards {
        hand_id: Uuid,
        cards: Vec<Card>,
    },
    PlayerTurn {
        player_id: PlayerId,
        seat_index: SeatIndex,
        round_id: Uuid,
        deadline_ms: i64,
    },
    PlayerActed {
        player_id: PlayerId,
        seat_index: SeatIndex,
        action: ActionKind,
        /// Chips the action moved into the pot.
        paid: Chips,
        current_bet: Chips,
        pot_total: Chips,
        timed_out: bool,
        round_id: Uuid,
    },
    PhaseAdvanced {
        phase: Phase,
        community: Vec<Card>,
        round_id: Uuid,
        pots: Vec<PotView>,
    },
    HandResult {
        hand_id: Uuid,
        pots: Vec<PotResultView>,
        showdown_cards: Vec<ShowdownCardsView>,
        room: RoomView,
    },
    GameEnded {
        winner_id: Option<PlayerId>,
        room: RoomView,
    },
    Reconnected {
        room_id: String,
        player_id: PlayerId,
        room: RoomView,
        #[serde(skip_serializing_if = "Option::is_none")]
        my_cards: Option<Vec<Card>>,
        hand_id: Option<Uuid>,
        round_id: Option<Uuid>,
    },
    Error {
        code: String,
        message: String,
        #[serde(skip_serializing_if = "std::ops::Not::not", default)]
        should_clear_session: bool,
    },
}

impl From<GameError> for ServerEvent {
    fn from(err: GameError) -> Self {
        ServerEvent::Error {
            code: err.code().to_string(),
            message: err.to_string(),
            should_clear_session: err.should_clear_session(),
        }
    }
}

/// Version-stamped envelope around every outbound event. Versions are
/// strictly increasing per room; clients drop frames at or below the last
/// version they have seen.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Frame {
    pub state_version: u64,
    #[serde(flatten)]
    pub event: ServerEvent,
}

/// Public projection of one player. No hole cards, only their count.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub nickname: String,
    pub chips: Chips,
    pub current_bet: Chips,
    pub total_bet_this_hand: Chips,
    pub status: PlayerStatus,
    pub seat_index: Option<SeatIndex>,
    pub is_folded: bool,
    pub is_all_in: bool,
    pub has_acted: bool,
    pub is_current_turn: bool,
    pub is_dealer: bool,
    pub is_host: bool,
    pub is_ready: bool,
    pub is_connected: bool,
    pub hole_card_count: usize,
}

impl PlayerView {
    pub fn project(player: &Player) -> Self {
        Self {
            id: player.id,
            nickname: player.nickname.to_string(),
            chips: player.chips,
            current_bet: player.current_bet,
            total_bet_this_hand: player.total_bet_this_hand,
            status: player.status,
            seat_index: player.seat,
            is_folded: player.is_folded,
            is_all_in: player.is_all_in,
            has_acted: player.has_acted,
            is_current_turn: player.is_current_turn,
            is_dealer: player.is_dealer,
            is_host: player.is_host,
            is_ready: player.is_ready,
            is_connected: player.connection.is_some(),
            hole_card_count: player.hole_cards.len(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PotView {
    pub amount: Chips,
    pub eligible: Vec<PlayerId>,
}

/// Public projection of the hand state. The deck stays behind.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GameStateView {
    pub phase: Phase,
    pub community: Vec<Card>,
    pub pots: Vec<PotView>,
    pub current_seat: Option<SeatIndex>,
    pub dealer_seat: SeatIndex,
    pub small_blind_seat: SeatIndex,
    pub big_blind_seat: SeatIndex,
    pub current_bet: Chips,
    pub min_raise: Chips,
    pub round_index: u32,
    pub hand_id: Uuid,
    pub round_id: Uuid,
    pub hand_number: u64,
    pub turn_deadline_ms: Option<i64>,
}

impl GameStateView {
    pub fn project(game: &GameState) -> Self {
        Self {
            phase: game.phase,
            community: game.community.clone(),
            pots: game
                .pots
                .iter()
                .map(|p| PotView {
                    amount: p.amount,
                    eligible: p.eligible.iter().copied().collect(),
                })
                .collect(),
            current_seat: game.current_seat,
            dealer_seat: game.dealer_seat,
            small_blind_seat: game.small_blind_seat,
            big_blind_seat: game.big_blind_seat,
            current_bet: game.current_bet,
            min_raise: game.min_raise,
            round_index: game.round_index,
            hand_id: game.hand_id,
            round_id: game.round_id,
            hand_number: game.hand_number,
            turn_deadline_ms: game.turn_deadline_ms,
        }
    }
}

/// Public projection of a whole room.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RoomView {
    pub room_id: String,
    pub host_id: PlayerId,
    pub config: RoomConfig,
    pub is_playing: bool,
    pub players: Vec<PlayerView>,
    pub game: Option<GameStateView>,
    pub created_at: DateTime<Utc>,
}

impl RoomView {
    pub fn project(room: &Room) -> Self {
        let mut players: Vec<PlayerView> =
            room.players().map(PlayerView::project).collect();
        players.sort_by_key(|p| (p.seat_index.is_none(), p.seat_index));
        Self {
            room_id: room.id.clone(),
            host_id: room.host_id,
            config: room.config.clone(),
            is_playing: room.is_playing,
            players,
            game: room.game.as_ref().map(GameStateView::project),
            created_at: room.created_at,
        }
    }
}

/// Settlement of one pot in a hand result.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PotResultView {
    pub pot_index: usize,
    pub amount: Chips,
    pub awards: Vec<AwardView>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AwardView {
    pub player_id: PlayerId,
    pub amount: Chips,
}

/// Cards revealed at showdown, one entry per participant who reached it.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ShowdownCardsView {
    pub player_id: PlayerId,
    pub cards: Vec<Card>,
    pub category: Option<HandCategory>,
}
