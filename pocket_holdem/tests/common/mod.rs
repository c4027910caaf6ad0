//! Shared helpers for integration tests: deterministic rooms with seated
//! players and stacked decks.

#![allow(dead_code)]

use pocket_holdem::game::entities::{
    ActionKind, ActionRequest, Card, Chips, ConnectionId, Deck, Nickname, PlayerId, Suit,
};
use pocket_holdem::room::messages::Outgoing;
use pocket_holdem::room::{Room, RoomConfig};
use uuid::Uuid;

/// A deterministic room with `n` players seated at seats `0..n`. Player 0
/// is the host; everyone else is marked ready.
pub fn seated_room(n: usize, config: RoomConfig, seed: u64) -> (Room, Vec<Member>) {
    let host_connection = Uuid::new_v4();
    let (mut room, host_id, _) = Room::with_seed(
        "900001".to_string(),
        config,
        Nickname::new("p0"),
        host_connection,
        seed,
    );
    room.sit_down(host_id, 0).unwrap();
    let mut members = vec![Member {
        player_id: host_id,
        connection_id: host_connection,
    }];
    for i in 1..n {
        let connection_id = Uuid::new_v4();
        let (player_id, _, _) = room
            .join(Nickname::new(&format!("p{i}")), connection_id, None)
            .unwrap();
        room.sit_down(player_id, i).unwrap();
        room.set_ready(player_id).unwrap();
        members.push(Member {
            player_id,
            connection_id,
        });
    }
    (room, members)
}

#[derive(Clone, Copy, Debug)]
pub struct Member {
    pub player_id: PlayerId,
    pub connection_id: ConnectionId,
}

/// Seat-index blinds config used by most scenarios.
pub fn blinds_10_20() -> RoomConfig {
    RoomConfig {
        small_blind: 10,
        big_blind: 20,
        ..RoomConfig::default()
    }
}

pub fn current_actor(room: &Room) -> PlayerId {
    let seat = room
        .game
        .as_ref()
        .and_then(|g| g.current_seat)
        .expect("a player should be on the clock");
    room.player_at_seat(seat).unwrap().id
}

pub fn round_index(room: &Room) -> u32 {
    room.game.as_ref().unwrap().round_index
}

/// Submit an action with a fresh request id for the current round.
pub fn act(
    room: &mut Room,
    player_id: PlayerId,
    kind: ActionKind,
    amount: Option<Chips>,
) -> Vec<Outgoing> {
    let request = ActionRequest {
        kind,
        amount,
        round_index: round_index(room),
        request_id: Uuid::new_v4(),
    };
    room.apply_action(player_id, &request)
        .unwrap_or_else(|e| panic!("action {kind} rejected: {e}"))
}

pub fn card(value: u8, suit: Suit) -> Card {
    Card(value, suit)
}

/// Queue a deck that deals the given cards in order.
pub fn stack(room: &mut Room, cards: Vec<Card>) {
    room.stack_deck(Deck::stacked(cards));
}

/// Total chips held by players plus live bets; the conserved quantity.
pub fn table_total(room: &Room) -> Chips {
    room.table_total()
}
