//! # Pocket Holdem
//!
//! The authoritative server core of a multi-room Texas Hold'em game: room
//! lifecycle and seating, the per-room hand state machine, pure poker
//! combinatorics, and the typed event protocol with privacy-preserving
//! projections.
//!
//! ## Architecture
//!
//! Every room is a serial executor: a tokio task owning the room's state
//! exclusively and consuming a typed command inbox. Client actions,
//! membership changes and timer firings are all commands on that inbox,
//! so no two mutations of a room ever interleave. Rooms run concurrently
//! with each other; the [`room::RoomManager`] registry is the only shared
//! structure.
//!
//! Every observable transition stamps the room's monotonic state version
//! onto the emitted [`net::messages::Frame`], which clients use to drop
//! stale frames. Snapshots are projected: hole cards reach only their
//! owner's connection (or the showdown disclosure) and the deck never
//! leaves the room.
//!
//! ## Example
//!
//! ```
//! use pocket_holdem::game::entities::Nickname;
//! use pocket_holdem::room::{Room, RoomConfig};
//! use uuid::Uuid;
//!
//! let (mut room, host_id, _events) = Room::with_seed(
//!     "123456".to_string(),
//!     RoomConfig::default(),
//!     Nickname::new("host"),
//!     Uuid::new_v4(),
//!     7,
//! );
//! room.sit_down(host_id, 0).unwrap();
//! assert_eq!(room.occupied_seats(), vec![0]);
//! ```

pub mod game;
pub mod net;
pub mod room;

pub use game::{constants, engine, entities, eval};
pub use net::{ClientMessage, Frame, GameError, RoomView, ServerEvent};
pub use room::{Room, RoomConfig, RoomHandle, RoomManager, RoomOverrides};
