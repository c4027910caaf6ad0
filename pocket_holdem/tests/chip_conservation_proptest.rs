//! Conservation of chips: no sequence of actions, settlements or
//! timeouts creates or destroys chips, and state versions only ever move
//! forward.

mod common;

use common::*;
use pocket_holdem::game::entities::{ActionKind, ActionRequest, Phase};
use pocket_holdem::room::state::DeadlineKind;
use proptest::prelude::*;
use uuid::Uuid;

/// Drive a whole session from a seed and a move tape, checking the
/// conserved total after every transition.
fn run_session(seed: u64, moves: &[u8]) {
    let (mut room, members) = seated_room(3, blinds_10_20(), seed);
    room.start_game(members[0].player_id).unwrap();
    let initial_total = table_total(&room);
    let mut last_version = room.state_version();

    for &m in moves {
        if !room.is_playing {
            break;
        }
        let game = room.game.as_ref().unwrap();
        let events = if game.phase == Phase::Idle {
            // Inter-hand pause: fire the scheduled deal.
            assert_eq!(
                room.deadline.map(|d| d.kind),
                Some(DeadlineKind::NextHand)
            );
            room.handle_deadline()
        } else if m % 5 == 4 {
            // Let the turn timer arbitrate occasionally.
            room.handle_deadline()
        } else {
            let actor = current_actor(&room);
            let candidates: &[ActionKind] = match m % 5 {
                0 => &[ActionKind::Fold],
                1 => &[ActionKind::Check, ActionKind::Call],
                2 => &[ActionKind::Call, ActionKind::Check],
                _ => &[ActionKind::Raise, ActionKind::AllIn],
            };
            let mut events = None;
            for &kind in candidates {
                let amount = (kind == ActionKind::Raise).then(|| {
                    let game = room.game.as_ref().unwrap();
                    game.current_bet + game.min_raise
                });
                let request = ActionRequest {
                    kind,
                    amount,
                    round_index: round_index(&room),
                    request_id: Uuid::new_v4(),
                };
                if let Ok(ok) = room.apply_action(actor, &request) {
                    events = Some(ok);
                    break;
                }
            }
            // Every legal position admits at least a fold.
            events.unwrap_or_else(|| {
                let request = ActionRequest {
                    kind: ActionKind::Fold,
                    amount: None,
                    round_index: round_index(&room),
                    request_id: Uuid::new_v4(),
                };
                room.apply_action(actor, &request).unwrap()
            })
        };

        assert_eq!(
            table_total(&room),
            initial_total,
            "chips not conserved (seed {seed}, move {m})"
        );
        for event in &events {
            assert!(event.frame.state_version > last_version);
            last_version = event.frame.state_version;
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_chips_conserved_across_random_sessions(
        seed in any::<u64>(),
        moves in prop::collection::vec(any::<u8>(), 10..80),
    ) {
        run_session(seed, &moves);
    }
}

/// Deterministic smoke case of the same driver, for quick failures.
#[test]
fn test_chips_conserved_scripted_session() {
    run_session(42, &[1, 1, 1, 2, 2, 2, 3, 1, 1, 4, 0, 1, 2, 1, 1, 1, 2, 2, 1, 0]);
}
