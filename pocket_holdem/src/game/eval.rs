//! Pure hand evaluation: classify five cards, score them on a single
//! totally-ordered scale, and pick the best five-of-seven.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::entities::{Card, Suit, Value};

/// Hand categories from weakest to strongest. The discriminant doubles as
/// the leading digit group of the score encoding.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandCategory {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
    RoyalFlush,
}

impl HandCategory {
    fn strength(self) -> u64 {
        match self {
            Self::HighCard => 0,
            Self::OnePair => 1,
            Self::TwoPair => 2,
            Self::ThreeOfAKind => 3,
            Self::Straight => 4,
            Self::Flush => 5,
            Self::FullHouse => 6,
            Self::FourOfAKind => 7,
            Self::StraightFlush => 8,
            Self::RoyalFlush => 9,
        }
    }
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::HighCard => "high card",
            Self::OnePair => "one pair",
            Self::TwoPair => "two pair",
            Self::ThreeOfAKind => "three of a kind",
            Self::Straight => "straight",
            Self::Flush => "flush",
            Self::FullHouse => "full house",
            Self::FourOfAKind => "four of a kind",
            Self::StraightFlush => "straight flush",
            Self::RoyalFlush => "royal flush",
        };
        write!(f, "{repr}")
    }
}

/// A classified hand: category plus the kicker vector that breaks ties
/// within the category, collapsed into one positional score.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HandValue {
    pub category: HandCategory,
    pub kickers: Vec<Value>,
    pub score: u64,
}

impl HandValue {
    fn new(category: HandCategory, kickers: Vec<Value>) -> Self {
        // category × 10^10, then two decimal digits per kicker slot.
        let mut score = category.strength() * 10_000_000_000;
        let weights = [100_000_000, 1_000_000, 10_000, 100, 1];
        for (kicker, weight) in kickers.iter().zip(weights) {
            score += u64::from(*kicker) * weight;
        }
        Self {
            category,
            kickers,
            score,
        }
    }
}

impl PartialEq for HandValue {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score
    }
}

impl Eq for HandValue {}

impl PartialOrd for HandValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HandValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.cmp(&other.score)
    }
}

/// Classify exactly five cards.
pub fn classify_five(cards: &[Card; 5]) -> HandValue {
    let mut values: Vec<Value> = cards.iter().map(|c| c.0).collect();
    values.sort_unstable_by(|a, b| b.cmp(a));

    let is_flush = cards.iter().all(|c| c.1 == cards[0].1);
    let straight_high = straight_high_card(&values);

    if let Some(high) = straight_high {
        if is_flush {
            return if high == 14 {
                HandValue::new(HandCategory::RoyalFlush, vec![14])
            } else {
                HandValue::new(HandCategory::StraightFlush, vec![high])
            };
        }
        return HandValue::new(HandCategory::Straight, vec![high]);
    }

    // Group values by multiplicity, highest count first, then highest value.
    let mut groups: Vec<(usize, Value)> = Vec::with_capacity(5);
    for &v in &values {
        match groups.iter_mut().find(|(_, gv)| *gv == v) {
            Some((count, _)) => *count += 1,
            None => groups.push((1, v)),
        }
    }
    groups.sort_unstable_by(|a, b| b.cmp(a));

    let kickers: Vec<Value> = groups.iter().map(|(_, v)| *v).collect();
    match groups[0].0 {
        4 => HandValue::new(HandCategory::FourOfAKind, kickers),
        3 if groups[1].0 == 2 => HandValue::new(HandCategory::FullHouse, kickers),
        3 => HandValue::new(HandCategory::ThreeOfAKind, kickers),
        2 if groups[1].0 == 2 => HandValue::new(HandCategory::TwoPair, kickers),
        2 => HandValue::new(HandCategory::OnePair, kickers),
        _ if is_flush => HandValue::new(HandCategory::Flush, kickers),
        _ => HandValue::new(HandCategory::HighCard, kickers),
    }
}

/// High card of a straight formed by `values` (sorted descending), if any.
/// The wheel A-2-3-4-5 ranks with 5 as its high card.
fn straight_high_card(values: &[Value]) -> Option<Value> {
    let mut distinct = values.to_vec();
    distinct.dedup();
    if distinct.len() != 5 {
        return None;
    }
    if distinct[0] - distinct[4] == 4 {
        return Some(distinct[0]);
    }
    if distinct == [14, 5, 4, 3, 2] {
        return Some(5);
    }
    None
}

/// Best five-card hand from five to seven cards, by enumerating every
/// five-card subset (C(7,5) = 21 at showdown).
pub fn best_hand(cards: &[Card]) -> HandValue {
    assert!(
        (5..=7).contains(&cards.len()),
        "hand evaluation needs 5-7 cards"
    );
    let n = cards.len();
    let mut best: Option<HandValue> = None;
    // Enumerate subsets by the (up to two) indices left out.
    for skip_a in 0..n {
        for skip_b in skip_a..n {
            match n {
                5 if (skip_a, skip_b) != (0, 0) => continue,
                6 if skip_a != skip_b => continue,
                7 if skip_a == skip_b => continue,
                _ => {}
            }
            let mut pick = [Card(0, Suit::Club); 5];
            let mut w = 0;
            for (i, card) in cards.iter().enumerate() {
                if n > 5 && (i == skip_a || i == skip_b) {
                    continue;
                }
                pick[w] = *card;
                w += 1;
            }
            let value = classify_five(&pick);
            if best.as_ref().is_none_or(|b| value > *b) {
                best = Some(value);
            }
        }
    }
    best.expect("at least one five-card subset")
}
