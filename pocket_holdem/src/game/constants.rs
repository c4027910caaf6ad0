//! Shared game constants.

/// Hard upper bound on seats at a table. Room configs may pick fewer.
pub const MAX_SEATS: usize = 9;

/// A hand cannot start with fewer seated, funded players than this.
pub const MIN_PLAYERS_TO_START: usize = 2;

/// Hole cards dealt to each player.
pub const HOLE_CARDS_PER_PLAYER: usize = 2;

/// Community cards on a full board.
pub const BOARD_SIZE: usize = 5;

/// Community cards dealt on the flop.
pub const FLOP_SIZE: usize = 3;

/// Maximum accepted nickname length; longer input is truncated.
pub const MAX_NICKNAME_LENGTH: usize = 16;

/// Capacity of the per-room processed-request LRU used for idempotency.
pub const REQUEST_LOG_CAPACITY: usize = 500;

/// Room ids are decimal strings drawn from `[0, ROOM_ID_SPACE)`.
pub const ROOM_ID_SPACE: u32 = 1_000_000;

/// Width of a room id string.
pub const ROOM_ID_DIGITS: usize = 6;
