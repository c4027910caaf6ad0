//! Validation errors surfaced to clients.
//!
//! Every variant maps to a stable wire code. Errors are always scoped to
//! the request that caused them; broadcasts never carry errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::entities::Chips;

#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("room not found")]
    RoomNotFound,
    #[error("not in a room")]
    NotInRoom,
    #[error("only the host can do that")]
    NotHost,
    #[error("game already started")]
    GameAlreadyStarted,
    #[error("need 2+ seated players with chips")]
    NotEnoughPlayers,
    #[error("not allowed while a hand is in progress")]
    GameInProgress,
    #[error("seat is occupied")]
    SeatOccupied,
    #[error("already seated")]
    AlreadySeated,
    #[error("seat index out of range")]
    InvalidSeatIndex,
    #[error("not seated")]
    NotSeated,
    #[error("can't kick yourself")]
    CannotKickSelf,
    #[error("target player not found")]
    TargetNotFound,
    #[error("seated players must be ready")]
    PlayersNotReady,
    #[error("duplicate request")]
    DuplicateRequest,
    #[error("request from a previous round")]
    StaleRequest,
    #[error("not your turn")]
    NotYourTurn,
    #[error("you can't act right now")]
    CannotAct,
    #[error("there's a bet to you, call or fold")]
    CannotCheckMustCall,
    #[error("nothing to call")]
    NothingToCall,
    #[error("raise must be at least {minimum}")]
    RaiseTooSmall { minimum: Chips },
    #[error("not enough chips")]
    NotEnoughChips,
    #[error("invalid room config: {reason}")]
    InvalidConfig { reason: String },
    #[error("malformed message")]
    BadMessage,
}

impl GameError {
    /// Stable machine-readable code carried on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RoomNotFound => "ROOM_NOT_FOUND",
            Self::NotInRoom => "NOT_IN_ROOM",
            Self::NotHost => "NOT_HOST",
            Self::GameAlreadyStarted => "GAME_ALREADY_STARTED",
            Self::NotEnoughPlayers => "NOT_ENOUGH_PLAYERS",
            Self::GameInProgress => "GAME_IN_PROGRESS",
            Self::SeatOccupied => "SEAT_OCCUPIED",
            Self::AlreadySeated => "ALREADY_SEATED",
            Self::InvalidSeatIndex => "INVALID_SEAT_INDEX",
            Self::NotSeated => "NOT_SEATED",
            Self::CannotKickSelf => "CANNOT_KICK_SELF",
            Self::TargetNotFound => "TARGET_NOT_FOUND",
            Self::PlayersNotReady => "PLAYERS_NOT_READY",
            Self::DuplicateRequest => "DUPLICATE_REQUEST",
            Self::StaleRequest => "STALE_REQUEST",
            Self::NotYourTurn => "NOT_YOUR_TURN",
            Self::CannotAct => "CANNOT_ACT",
            Self::CannotCheckMustCall => "CANNOT_CHECK_MUST_CALL",
            Self::NothingToCall => "NOTHING_TO_CALL",
            Self::RaiseTooSmall { .. } => "RAISE_TOO_SMALL",
            Self::NotEnoughChips => "NOT_ENOUGH_CHIPS",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::BadMessage => "BAD_MESSAGE",
        }
    }

    /// Whether the client should drop its stored `{room_id, player_id}`
    /// session. True for reconnect attempts against state that no longer
    /// exists.
    pub fn should_clear_session(&self) -> bool {
        matches!(self, Self::RoomNotFound | Self::TargetNotFound)
    }
}
