//! Wire protocol types and error codes shared between the room core and
//! the gateway.

pub mod errors;
pub mod messages;

pub use errors::GameError;
pub use messages::{ClientMessage, Frame, RoomView, ServerEvent};
