//! Pure table combinatorics: acting order, button rotation, blind
//! positions, side-pot construction and pot awarding.
//!
//! Everything here operates on values passed in and retains nothing.

use std::collections::{BTreeSet, HashMap};

use super::entities::{Chips, PlayerId, Pot, SeatIndex};
use super::eval::HandValue;

/// Cyclic seat order starting at the seat after `pivot`. `seats` must be
/// sorted ascending; the pivot itself (if present) comes last.
pub fn seats_after(pivot: SeatIndex, seats: &[SeatIndex]) -> Vec<SeatIndex> {
    let mut ordered: Vec<SeatIndex> = seats.iter().copied().filter(|&s| s > pivot).collect();
    ordered.extend(seats.iter().copied().filter(|&s| s <= pivot));
    ordered
}

/// First seat strictly after `pivot` in cyclic order, if any other exists.
pub fn next_seat_after(pivot: SeatIndex, seats: &[SeatIndex]) -> Option<SeatIndex> {
    seats_after(pivot, seats).into_iter().find(|&s| s != pivot)
}

/// Next dealer seat: the first eligible seat after the previous button,
/// wrapping and skipping empty or busted seats. With no previous button
/// the lowest eligible seat takes it.
pub fn next_dealer(prev: Option<SeatIndex>, eligible: &[SeatIndex]) -> Option<SeatIndex> {
    match prev {
        None => eligible.first().copied(),
        Some(p) => next_seat_after(p, eligible).or_else(|| eligible.first().copied()),
    }
}

/// Blind seats and the pre-flop first actor for one hand.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HandPositions {
    pub dealer: SeatIndex,
    pub small_blind: SeatIndex,
    pub big_blind: SeatIndex,
    pub first_actor: SeatIndex,
}

/// Compute blind positions from the button. `seats` are the participating
/// seats sorted ascending and must contain the dealer and at least two
/// entries. Heads-up is the special case: the dealer posts the small blind
/// and acts first pre-flop.
pub fn hand_positions(dealer: SeatIndex, seats: &[SeatIndex]) -> HandPositions {
    debug_assert!(seats.len() >= 2);
    debug_assert!(seats.contains(&dealer));
    let order = seats_after(dealer, seats);
    if seats.len() == 2 {
        return HandPositions {
            dealer,
            small_blind: dealer,
            big_blind: order[0],
            first_actor: dealer,
        };
    }
    HandPositions {
        dealer,
        small_blind: order[0],
        big_blind: order[1],
        first_actor: order[2 % order.len()],
    }
}

/// One player's total contribution to the hand.
#[derive(Clone, Copy, Debug)]
pub struct Contribution {
    pub player_id: PlayerId,
    pub seat: SeatIndex,
    pub amount: Chips,
    pub folded: bool,
}

/// Build the pot structure from hand contributions.
///
/// Contributions are layered by distinct amounts ascending; each layer
/// collects `(tier - previous) × players at or above the tier` and is
/// eligible to the unfolded players at or above it. If everyone at a tier
/// folded, the layer falls to the lowest-seat surviving contributor.
/// Adjacent layers with identical eligibility collapse into one pot, so
/// the first element is the main pot and side pots follow in increasing
/// contribution order.
pub fn build_pots(contributions: &[Contribution]) -> Vec<Pot> {
    let contribs: Vec<&Contribution> = contributions.iter().filter(|c| c.amount > 0).collect();
    if contribs.is_empty() {
        return Vec::new();
    }

    let mut tiers: Vec<Chips> = contribs.iter().map(|c| c.amount).collect();
    tiers.sort_unstable();
    tiers.dedup();

    let mut pots: Vec<Pot> = Vec::with_capacity(tiers.len());
    let mut prev_tier = 0;
    for tier in tiers {
        let at_or_above: Vec<&&Contribution> =
            contribs.iter().filter(|c| c.amount >= tier).collect();
        let amount = (tier - prev_tier) * at_or_above.len() as Chips;
        let mut eligible: BTreeSet<PlayerId> = at_or_above
            .iter()
            .filter(|c| !c.folded)
            .map(|c| c.player_id)
            .collect();
        if eligible.is_empty()
            && let Some(survivor) = contribs.iter().filter(|c| !c.folded).min_by_key(|c| c.seat)
        {
            eligible.insert(survivor.player_id);
        }
        match pots.last_mut() {
            Some(last) if last.eligible == eligible => last.amount += amount,
            _ => pots.push(Pot::new(amount, eligible)),
        }
        prev_tier = tier;
    }
    pots
}

/// One winner's cut of one pot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PotAward {
    pub player_id: PlayerId,
    pub amount: Chips,
}

/// Award each pot to the best-scoring eligible hands. Ties split the pot
/// evenly; the remainder goes one chip at a time in ascending seat order.
/// Players without a score (folded before showdown) never win.
pub fn award_pots(
    pots: &[Pot],
    scores: &HashMap<PlayerId, HandValue>,
    seat_of: &HashMap<PlayerId, SeatIndex>,
) -> Vec<Vec<PotAward>> {
    pots.iter()
        .map(|pot| {
            let candidates: Vec<(PlayerId, u64)> = pot
                .eligible
                .iter()
                .filter_map(|id| scores.get(id).map(|v| (*id, v.score)))
                .collect();
            let Some(best) = candidates.iter().map(|(_, s)| *s).max() else {
                return Vec::new();
            };
            let mut winners: Vec<PlayerId> = candidates
                .iter()
                .filter(|(_, s)| *s == best)
                .map(|(id, _)| *id)
                .collect();
            winners.sort_by_key(|id| seat_of.get(id).copied().unwrap_or(usize::MAX));

            let n = winners.len() as Chips;
            let share = pot.amount / n;
            let remainder = pot.amount % n;
            winners
                .into_iter()
                .enumerate()
                .map(|(i, player_id)| PotAward {
                    player_id,
                    amount: share + Chips::from((i as Chips) < remainder),
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Card, Suit};
    use crate::game::eval::classify_five;
    use uuid::Uuid;

    #[test]
    fn test_seats_after_wraps() {
        let seats = [0, 2, 5, 7];
        assert_eq!(seats_after(2, &seats), vec![5, 7, 0, 2]);
        assert_eq!(seats_after(7, &seats), vec![0, 2, 5, 7]);
        // Pivot not in the set still anchors the rotation.
        assert_eq!(seats_after(3, &seats), vec![5, 7, 0, 2]);
    }

    #[test]
    fn test_next_seat_after() {
        let seats = [1, 4, 6];
        assert_eq!(next_seat_after(1, &seats), Some(4));
        assert_eq!(next_seat_after(6, &seats), Some(1));
        assert_eq!(next_seat_after(4, &[4]), None);
    }

    #[test]
    fn test_next_dealer_skips_busted_seats() {
        // Seat 3 busted out, so it is absent from the eligible list.
        let eligible = [0, 1, 5];
        assert_eq!(next_dealer(Some(1), &eligible), Some(5));
        assert_eq!(next_dealer(Some(5), &eligible), Some(0));
        assert_eq!(next_dealer(None, &eligible), Some(0));
    }

    #[test]
    fn test_hand_positions_three_plus() {
        let p = hand_positions(0, &[0, 1, 2]);
        assert_eq!(p.small_blind, 1);
        assert_eq!(p.big_blind, 2);
        // Third after the dealer wraps back to the button.
        assert_eq!(p.first_actor, 0);

        let p = hand_positions(7, &[1, 3, 5, 7]);
        assert_eq!(p.small_blind, 1);
        assert_eq!(p.big_blind, 3);
        assert_eq!(p.first_actor, 5);
    }

    #[test]
    fn test_hand_positions_heads_up() {
        let p = hand_positions(4, &[2, 4]);
        assert_eq!(p.dealer, 4);
        assert_eq!(p.small_blind, 4);
        assert_eq!(p.big_blind, 2);
        assert_eq!(p.first_actor, 4);
    }

    fn contribution(seat: SeatIndex, amount: Chips, folded: bool) -> Contribution {
        Contribution {
            player_id: Uuid::new_v4(),
            seat,
            amount,
            folded,
        }
    }

    #[test]
    fn test_build_pots_single_tier() {
        let contribs = [
            contribution(0, 100, false),
            contribution(1, 100, false),
            contribution(2, 100, false),
        ];
        let pots = build_pots(&contribs);
        assert_eq!(pots.len(), 1);
        assert_eq!(pots[0].amount, 300);
        assert_eq!(pots[0].eligible.len(), 3);
    }

    #[test]
    fn test_build_pots_all_in_side_pot() {
        // 100 all-in vs two 200 stacks: main 300 (everyone), side 200.
        let short = contribution(0, 100, false);
        let mid = contribution(1, 200, false);
        let big = contribution(2, 200, false);
        let pots = build_pots(&[short, mid, big]);
        assert_eq!(pots.len(), 2);
        assert_eq!(pots[0].amount, 300);
        assert!(pots[0].eligible.contains(&short.player_id));
        assert_eq!(pots[1].amount, 200);
        assert!(!pots[1].eligible.contains(&short.player_id));
        assert!(pots[1].eligible.contains(&mid.player_id));
        assert!(pots[1].eligible.contains(&big.player_id));
    }

    #[test]
    fn test_build_pots_folded_contribution_merges_layers() {
        // A folded small blind adds dead money but no new eligibility, so
        // the layers collapse into one pot.
        let folded_sb = contribution(1, 10, true);
        let winner = contribution(2, 20, false);
        let pots = build_pots(&[folded_sb, winner]);
        assert_eq!(pots.len(), 1);
        assert_eq!(pots[0].amount, 30);
        assert_eq!(
            pots[0].eligible.iter().copied().collect::<Vec<_>>(),
            vec![winner.player_id]
        );
    }

    #[test]
    fn test_build_pots_top_tier_all_folded() {
        // The deepest contributor folded; their excess falls to the lowest
        // surviving seat.
        let survivor_low = contribution(0, 50, false);
        let survivor_high = contribution(1, 50, false);
        let deep_folder = contribution(2, 120, true);
        let pots = build_pots(&[survivor_low, survivor_high, deep_folder]);
        let total: Chips = pots.iter().map(|p| p.amount).sum();
        assert_eq!(total, 220);
        let top = pots.last().unwrap();
        assert_eq!(
            top.eligible.iter().copied().collect::<Vec<_>>(),
            vec![survivor_low.player_id]
        );
    }

    #[test]
    fn test_build_pots_sum_matches_contributions() {
        let contribs = [
            contribution(0, 25, false),
            contribution(1, 75, true),
            contribution(2, 150, false),
            contribution(3, 150, false),
        ];
        let pots = build_pots(&contribs);
        let total: Chips = pots.iter().map(|p| p.amount).sum();
        assert_eq!(total, 400);
    }

    fn value_of(cards: [(u8, Suit); 5]) -> HandValue {
        let cards: Vec<Card> = cards.iter().map(|&(v, s)| Card(v, s)).collect();
        classify_five(&cards.try_into().unwrap())
    }

    #[test]
    fn test_award_pots_split_with_remainder() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let pot = Pot::new(101, [a, b, c].into_iter().collect());

        let same = value_of([
            (14, Suit::Club),
            (13, Suit::Heart),
            (9, Suit::Spade),
            (6, Suit::Diamond),
            (3, Suit::Club),
        ]);
        let worse = value_of([
            (10, Suit::Club),
            (8, Suit::Heart),
            (6, Suit::Spade),
            (4, Suit::Diamond),
            (2, Suit::Club),
        ]);
        let scores: HashMap<PlayerId, HandValue> =
            [(a, same.clone()), (b, same), (c, worse)].into_iter().collect();
        // Seat b below seat a: b takes the odd chip.
        let seat_of: HashMap<PlayerId, SeatIndex> =
            [(a, 4), (b, 1), (c, 2)].into_iter().collect();

        let awards = award_pots(&[pot], &scores, &seat_of);
        assert_eq!(awards.len(), 1);
        assert_eq!(
            awards[0],
            vec![
                PotAward {
                    player_id: b,
                    amount: 51
                },
                PotAward {
                    player_id: a,
                    amount: 50
                },
            ]
        );
    }

    #[test]
    fn test_award_pots_ignores_unscored_players() {
        let folded = Uuid::new_v4();
        let shown = Uuid::new_v4();
        let pot = Pot::new(80, [folded, shown].into_iter().collect());
        let scores: HashMap<PlayerId, HandValue> = [(
            shown,
            value_of([
                (2, Suit::Club),
                (4, Suit::Heart),
                (6, Suit::Spade),
                (9, Suit::Diamond),
                (11, Suit::Club),
            ]),
        )]
        .into_iter()
        .collect();
        let seat_of: HashMap<PlayerId, SeatIndex> =
            [(folded, 0), (shown, 1)].into_iter().collect();

        let awards = award_pots(&[pot], &scores, &seat_of);
        assert_eq!(awards[0].len(), 1);
        assert_eq!(awards[0][0].player_id, shown);
        assert_eq!(awards[0][0].amount, 80);
    }
}
