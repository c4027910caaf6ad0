//! Rooms: state, configuration, the per-room actor and the process-wide
//! registry.
//!
//! Each room runs on its own serial executor (a tokio task consuming a
//! command inbox), so nothing in [`state`] needs synchronization. The
//! [`manager`] owns the only shared map.

pub mod actor;
pub mod config;
pub mod manager;
pub mod messages;
pub mod state;

pub use actor::{RoomActor, RoomHandle};
pub use config::{RoomConfig, RoomOverrides};
pub use manager::RoomManager;
pub use messages::{JoinReply, Outgoing, Recipient, RoomCommand, RoomSummary};
pub use state::Room;
