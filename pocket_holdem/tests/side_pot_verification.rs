//! Side-pot construction and settlement against full hands: layered
//! all-ins, folded dead money, and remainder distribution.

mod common;

use common::*;
use pocket_holdem::game::entities::{ActionKind, Phase, Suit};
use pocket_holdem::net::messages::ServerEvent;
use pocket_holdem::room::RoomConfig;

/// Three stacks of 100/200/300. Short stack shoves pre-flop, the middle
/// stack shoves the flop: main pot of 300 for everyone, side pot of 200
/// between the two big stacks.
#[test]
fn test_layered_all_ins_build_main_and_side_pot() {
    let config = RoomConfig::default(); // blinds 5/10
    let (mut room, members) = seated_room(3, config, 4);
    room.player_mut(&members[0].player_id).unwrap().chips = 100;
    room.player_mut(&members[1].player_id).unwrap().chips = 200;
    room.player_mut(&members[2].player_id).unwrap().chips = 300;

    // Deal order with the button on seat 0: seats 1, 2, 0 per pass.
    stack(
        &mut room,
        vec![
            card(13, Suit::Spade),  // seat 1
            card(12, Suit::Spade),  // seat 2
            card(14, Suit::Spade),  // seat 0
            card(13, Suit::Heart),  // seat 1
            card(12, Suit::Heart),  // seat 2
            card(14, Suit::Heart),  // seat 0
            card(4, Suit::Club),    // burn
            card(2, Suit::Club),    // flop
            card(7, Suit::Diamond), // flop
            card(9, Suit::Spade),   // flop
            card(6, Suit::Heart),   // burn
            card(3, Suit::Heart),   // turn
            card(8, Suit::Diamond), // burn
            card(5, Suit::Club),    // river
        ],
    );
    room.start_game(members[0].player_id).unwrap();
    let initial_total = table_total(&room);

    // Pre-flop: the short stack shoves 100, both others call.
    act(&mut room, members[0].player_id, ActionKind::AllIn, None);
    act(&mut room, members[1].player_id, ActionKind::Call, None);
    act(&mut room, members[2].player_id, ActionKind::Call, None);
    assert_eq!(room.game.as_ref().unwrap().phase, Phase::Flop);

    // Flop: middle stack shoves its remaining 100; the big stack calls,
    // and with nobody left to bet the board runs out.
    act(&mut room, members[1].player_id, ActionKind::AllIn, None);
    let events = act(&mut room, members[2].player_id, ActionKind::Call, None);

    let pots = events
        .iter()
        .find_map(|e| match &e.frame.event {
            ServerEvent::HandResult { pots, .. } => Some(pots.clone()),
            _ => None,
        })
        .expect("all-in runout settles the hand");

    assert_eq!(pots.len(), 2);
    assert_eq!(pots[0].amount, 300);
    assert_eq!(pots[1].amount, 200);
    // Aces take the main pot; kings take the side pot they alone contest
    // with the queens.
    assert_eq!(pots[0].awards.len(), 1);
    assert_eq!(pots[0].awards[0].player_id, members[0].player_id);
    assert_eq!(pots[0].awards[0].amount, 300);
    assert_eq!(pots[1].awards.len(), 1);
    assert_eq!(pots[1].awards[0].player_id, members[1].player_id);
    assert_eq!(pots[1].awards[0].amount, 200);

    assert_eq!(room.player(&members[0].player_id).unwrap().chips, 300);
    assert_eq!(room.player(&members[1].player_id).unwrap().chips, 200);
    assert_eq!(room.player(&members[2].player_id).unwrap().chips, 100);
    assert_eq!(table_total(&room), initial_total);
}

/// A folded player's chips stay in the pot but their id never appears in
/// any recomputed eligibility set.
#[test]
fn test_folded_player_never_eligible() {
    let (mut room, members) = seated_room(3, blinds_10_20(), 8);
    room.start_game(members[0].player_id).unwrap();

    act(&mut room, members[0].player_id, ActionKind::Call, None);
    // Small blind folds 10 into the pot.
    act(&mut room, members[1].player_id, ActionKind::Fold, None);
    let events = act(&mut room, members[2].player_id, ActionKind::Check, None);

    let folded_id = members[1].player_id;
    for outgoing in &events {
        if let ServerEvent::PhaseAdvanced { pots, .. } = &outgoing.frame.event {
            assert!(!pots.is_empty());
            for pot in pots {
                assert!(!pot.eligible.contains(&folded_id));
            }
        }
    }
    // The dead money is still in there.
    let game = room.game.as_ref().unwrap();
    let pot_total: u32 = game.pots.iter().map(|p| p.amount).sum();
    assert_eq!(pot_total, 50);
}

/// Pot layers always sum to the total contributions (invariant 4),
/// verified at every street of a raise-heavy hand.
#[test]
fn test_pot_layers_sum_to_contributions() {
    let (mut room, members) = seated_room(3, blinds_10_20(), 15);
    room.start_game(members[0].player_id).unwrap();

    act(&mut room, members[0].player_id, ActionKind::Raise, Some(60));
    act(&mut room, members[1].player_id, ActionKind::Call, None);
    act(&mut room, members[2].player_id, ActionKind::Call, None);

    let game = room.game.as_ref().unwrap();
    assert_eq!(game.phase, Phase::Flop);
    let pot_total: u32 = game.pots.iter().map(|p| p.amount).sum();
    assert_eq!(pot_total, room.live_pot_total());
    assert_eq!(pot_total, 180);
}

/// A split pot with a remainder hands the odd chips to the winners with
/// the smallest seat indices.
#[test]
fn test_split_pot_remainder_goes_to_low_seats() {
    let config = RoomConfig {
        small_blind: 5,
        big_blind: 15,
        ..RoomConfig::default()
    };
    let (mut room, members) = seated_room(3, config, 23);
    // Identical hands for seats 0 and 1; seat 2 misses everything.
    stack(
        &mut room,
        vec![
            card(10, Suit::Club),   // seat 1
            card(2, Suit::Club),    // seat 2
            card(10, Suit::Spade),  // seat 0
            card(9, Suit::Club),    // seat 1
            card(3, Suit::Diamond), // seat 2
            card(9, Suit::Spade),   // seat 0
            card(4, Suit::Club),    // burn
            card(14, Suit::Heart),  // flop
            card(14, Suit::Diamond),// flop
            card(6, Suit::Spade),   // turn... flop third card
            card(7, Suit::Heart),   // burn
            card(13, Suit::Spade),  // turn
            card(8, Suit::Club),    // burn
            card(12, Suit::Diamond),// river
        ],
    );
    room.start_game(members[0].player_id).unwrap();

    // Everyone just calls/checks the 15 blind down to showdown: pot 45.
    act(&mut room, members[0].player_id, ActionKind::Call, None);
    act(&mut room, members[1].player_id, ActionKind::Call, None);
    act(&mut room, members[2].player_id, ActionKind::Check, None);
    let mut events = Vec::new();
    while room.game.as_ref().unwrap().phase != Phase::Idle {
        let actor = current_actor(&room);
        events = act(&mut room, actor, ActionKind::Check, None);
    }

    let pots = events
        .iter()
        .find_map(|e| match &e.frame.event {
            ServerEvent::HandResult { pots, .. } => Some(pots.clone()),
            _ => None,
        })
        .expect("checked-down hand settles");

    // Seats 0 and 1 both hold tens and nines with the same board: a tie.
    // 45 / 2 = 22 rem 1; the odd chip lands on the lower seat.
    assert_eq!(pots.len(), 1);
    let awards = &pots[0].awards;
    assert_eq!(awards.len(), 2);
    let for_seat0 = awards
        .iter()
        .find(|a| a.player_id == members[0].player_id)
        .unwrap();
    let for_seat1 = awards
        .iter()
        .find(|a| a.player_id == members[1].player_id)
        .unwrap();
    assert_eq!(for_seat0.amount, 23);
    assert_eq!(for_seat1.amount, 22);
    assert_eq!(
        room.player(&members[2].player_id).unwrap().chips,
        1000 - 15
    );
}
