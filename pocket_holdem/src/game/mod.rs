//! Core poker logic: entities, pure combinatorics and the per-room hand
//! controller.
//!
//! - [`entities`]: cards, deck, players, pots, per-hand state
//! - [`eval`]: 5-of-7 hand evaluation with a total ordering
//! - [`engine`]: seat order, button rotation, side pots, awarding
//! - [`controller`]: the hand lifecycle, implemented on
//!   [`crate::room::state::Room`]

pub mod constants;
pub mod controller;
pub mod engine;
pub mod entities;
pub mod eval;
