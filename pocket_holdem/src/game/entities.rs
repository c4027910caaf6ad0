//! Core table entities: cards, the deck, players, pots and per-hand state.

use chrono::{DateTime, Utc};
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Deserializer, Serialize};
use std::{
    collections::{BTreeSet, HashSet, VecDeque},
    fmt,
};
use uuid::Uuid;

use super::constants;

/// Opaque player identifier. Clients persist it alongside the room id to
/// reconnect after a dropped connection.
pub type PlayerId = Uuid;

/// Identifier of a live client connection. Rebound on reconnect.
pub type ConnectionId = Uuid;

/// Seat position at the table.
pub type SeatIndex = usize;

/// Type alias for chip amounts. All stacks and bets are whole chips.
pub type Chips = u32;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Suit {
    Club,
    Spade,
    Diamond,
    Heart,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Spade, Suit::Diamond, Suit::Heart];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Spade => "♠",
            Self::Diamond => "♦",
            Self::Heart => "♥",
        };
        write!(f, "{repr}")
    }
}

/// Placeholder for card values. Deuce is 2, ace is 14.
pub type Value = u8;

/// A card is a tuple of a value (2u8..=14u8, ace high) and a suit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            14 => "A",
            11 => "J",
            12 => "Q",
            13 => "K",
            v => &v.to_string(),
        };
        let repr = format!("{value}/{}", self.1);
        write!(f, "{repr:>4}")
    }
}

/// A 52-card shoe. Never serialized: the remaining order is the one piece
/// of state that must not reach any client.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
    deck_idx: usize,
}

impl Default for Deck {
    fn default() -> Self {
        let mut cards = Vec::with_capacity(52);
        for value in 2u8..=14u8 {
            for suit in Suit::ALL {
                cards.push(Card(value, suit));
            }
        }
        Self { cards, deck_idx: 0 }
    }
}

impl Deck {
    /// A freshly shuffled deck using the given RNG. Rooms pass their own
    /// seeded RNG so tests can replay exact permutations.
    pub fn shuffled(rng: &mut impl Rng) -> Self {
        let mut deck = Self::default();
        deck.shuffle(rng);
        deck
    }

    /// A deck that deals the given cards in order. Deterministic play for
    /// tests and simulations; the caller is responsible for supplying a
    /// valid permutation.
    pub fn stacked(cards: Vec<Card>) -> Self {
        Self { cards, deck_idx: 0 }
    }

    /// Fisher-Yates over the full shoe; resets the deal position.
    pub fn shuffle(&mut self, rng: &mut impl Rng) {
        self.cards.shuffle(rng);
        self.deck_idx = 0;
    }

    pub fn deal_card(&mut self) -> Card {
        let card = self.cards[self.deck_idx];
        self.deck_idx += 1;
        card
    }

    /// Discard the top card before dealing community cards.
    pub fn burn(&mut self) {
        self.deck_idx += 1;
    }

    pub fn remaining(&self) -> usize {
        self.cards.len() - self.deck_idx
    }
}

/// Player display name. Whitespace collapses to underscores and overlong
/// input is truncated, matching what the rendering layer can handle.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Nickname(String);

impl Nickname {
    pub fn new(s: &str) -> Self {
        let mut nickname: String = s
            .chars()
            .map(|c| if c.is_ascii_whitespace() { '_' } else { c })
            .collect();
        nickname.truncate(constants::MAX_NICKNAME_LENGTH);
        Self(nickname)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nickname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for Nickname {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<String> for Nickname {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

/// Where a member currently stands in the room lifecycle.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    /// In the room, not seated.
    Spectating,
    /// Seated, waiting for the next hand.
    Waiting,
    /// Seated and dealt into the current hand.
    Active,
    /// Folded out of the current hand.
    Folded,
    /// Committed their whole stack this hand.
    AllIn,
    /// Busted; sits out until they stand up or the game ends.
    Eliminated,
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Spectating => "spectating",
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Folded => "folded",
            Self::AllIn => "all-in",
            Self::Eliminated => "eliminated",
        };
        write!(f, "{repr}")
    }
}

/// Per-seat state container. Validation lives in the room and controller;
/// these mutators only keep the internal fields consistent.
#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub nickname: Nickname,
    pub chips: Chips,
    /// Chips committed in the current betting round.
    pub current_bet: Chips,
    /// Chips committed across all rounds of the current hand.
    pub total_bet_this_hand: Chips,
    pub status: PlayerStatus,
    pub seat: Option<SeatIndex>,
    pub is_folded: bool,
    pub is_all_in: bool,
    pub has_acted: bool,
    pub is_current_turn: bool,
    pub is_dealer: bool,
    pub is_host: bool,
    pub is_ready: bool,
    pub hole_cards: Vec<Card>,
    /// None while disconnected. Timers keep running regardless.
    pub connection: Option<ConnectionId>,
}

impl Player {
    #[must_use]
    pub fn new(nickname: Nickname, connection: ConnectionId) -> Self {
        Self {
            id: Uuid::new_v4(),
            nickname,
            chips: 0,
            current_bet: 0,
            total_bet_this_hand: 0,
            status: PlayerStatus::Spectating,
            seat: None,
            is_folded: false,
            is_all_in: false,
            has_acted: false,
            is_current_turn: false,
            is_dealer: false,
            is_host: false,
            is_ready: false,
            hole_cards: Vec::with_capacity(constants::HOLE_CARDS_PER_PLAYER),
            connection: Some(connection),
        }
    }

    pub fn is_seated(&self) -> bool {
        self.seat.is_some()
    }

    /// Whether the player may take a betting action right now.
    pub fn can_act(&self) -> bool {
        self.is_seated()
            && self.status == PlayerStatus::Active
            && !self.is_folded
            && !self.is_all_in
    }

    /// Move up to `amount` chips from the stack into the current bet,
    /// returning what was actually paid. Draining the stack flips the
    /// player to all-in.
    pub fn deduct_chips(&mut self, amount: Chips) -> Chips {
        let paid = amount.min(self.chips);
        self.chips -= paid;
        self.current_bet += paid;
        self.total_bet_this_hand += paid;
        if self.chips == 0 && self.total_bet_this_hand > 0 {
            self.is_all_in = true;
            self.status = PlayerStatus::AllIn;
        }
        paid
    }

    /// Credit winnings. Only pot awarding calls this.
    pub fn add_chips(&mut self, amount: Chips) {
        self.chips += amount;
    }

    pub fn sit_down(&mut self, seat: SeatIndex, stake: Chips) {
        self.seat = Some(seat);
        self.chips = stake;
        self.status = PlayerStatus::Waiting;
        self.is_ready = false;
    }

    pub fn stand_up(&mut self) {
        self.seat = None;
        self.chips = 0;
        self.status = PlayerStatus::Spectating;
        self.is_ready = false;
        self.reset_for_new_hand();
    }

    pub fn fold(&mut self) {
        self.is_folded = true;
        self.status = PlayerStatus::Folded;
        self.has_acted = true;
    }

    /// Shove the remaining stack.
    pub fn all_in(&mut self) -> Chips {
        self.deduct_chips(self.chips)
    }

    pub fn reset_for_new_hand(&mut self) {
        self.current_bet = 0;
        self.total_bet_this_hand = 0;
        self.is_folded = false;
        self.is_all_in = false;
        self.has_acted = false;
        self.is_current_turn = false;
        self.is_dealer = false;
        self.is_ready = false;
        self.hole_cards.clear();
    }

    pub fn reset_for_new_round(&mut self) {
        self.current_bet = 0;
        if !self.is_folded && !self.is_all_in {
            self.has_acted = false;
        }
    }
}

/// A pot layer: the main pot first, side pots after in increasing
/// contribution order.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Pot {
    pub amount: Chips,
    pub eligible: BTreeSet<PlayerId>,
}

impl Pot {
    #[must_use]
    pub fn new(amount: Chips, eligible: BTreeSet<PlayerId>) -> Self {
        Self { amount, eligible }
    }
}

/// Betting phase of a hand. `Idle` covers both "no hand yet" and the
/// inter-hand pause.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Phase {
    /// Next betting street, saturating at showdown.
    pub fn next(self) -> Phase {
        match self {
            Phase::Idle => Phase::PreFlop,
            Phase::PreFlop => Phase::Flop,
            Phase::Flop => Phase::Turn,
            Phase::Turn => Phase::River,
            Phase::River | Phase::Showdown => Phase::Showdown,
        }
    }

    /// Community cards expected on the board once this street is dealt.
    pub fn board_size(self) -> usize {
        match self {
            Phase::Idle | Phase::PreFlop => 0,
            Phase::Flop => 3,
            Phase::Turn => 4,
            Phase::River | Phase::Showdown => 5,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Idle => "idle",
            Self::PreFlop => "pre-flop",
            Self::Flop => "flop",
            Self::Turn => "turn",
            Self::River => "river",
            Self::Showdown => "showdown",
        };
        write!(f, "{repr}")
    }
}

/// A betting action kind as it appears on the wire.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Raise,
    AllIn,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Fold => "fold",
            Self::Check => "check",
            Self::Call => "call",
            Self::Raise => "raise",
            Self::AllIn => "all-in",
        };
        write!(f, "{repr}")
    }
}

/// A client action submission. `round_index` pins the action to a betting
/// round; `request_id` is the idempotency key.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ActionRequest {
    pub kind: ActionKind,
    /// For raises: the new total bet target, not the increment.
    pub amount: Option<Chips>,
    pub round_index: u32,
    pub request_id: Uuid,
}

/// Append-only record of a resolved action.
#[derive(Clone, Debug, Serialize)]
pub struct ActionRecord {
    pub player_id: PlayerId,
    pub seat: SeatIndex,
    pub kind: ActionKind,
    /// Chips the action moved into the pot.
    pub paid: Chips,
    pub phase: Phase,
    pub round_index: u32,
    pub timed_out: bool,
    pub at: DateTime<Utc>,
}

/// Per-hand game state. Owned exclusively by the room; views are projected
/// from it, never the struct itself (it holds the deck).
#[derive(Clone, Debug)]
pub struct GameState {
    pub phase: Phase,
    pub community: Vec<Card>,
    pub pots: Vec<Pot>,
    pub current_seat: Option<SeatIndex>,
    pub dealer_seat: SeatIndex,
    pub small_blind_seat: SeatIndex,
    pub big_blind_seat: SeatIndex,
    /// Highest total bet any player has committed this round.
    pub current_bet: Chips,
    /// Minimum increment for the next full raise.
    pub min_raise: Chips,
    /// Per-hand betting-round counter, used to reject stale retries.
    pub round_index: u32,
    pub hand_id: Uuid,
    pub round_id: Uuid,
    /// 1-based across the room's lifetime.
    pub hand_number: u64,
    pub deck: Deck,
    pub history: Vec<ActionRecord>,
    /// Wall-clock deadline of the current turn, for client countdowns.
    pub turn_deadline_ms: Option<i64>,
}

impl GameState {
    pub fn pot_total(&self) -> Chips {
        self.pots.iter().map(|p| p.amount).sum()
    }
}

/// Bounded FIFO set of processed request ids. Duplicate submissions are
/// rejected with no side effects; the oldest entry is evicted once the
/// capacity is reached.
#[derive(Debug)]
pub struct RequestLog {
    seen: HashSet<Uuid>,
    order: VecDeque<Uuid>,
    capacity: usize,
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::new(constants::REQUEST_LOG_CAPACITY)
    }
}

impl RequestLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.seen.contains(id)
    }

    /// Record an id, returning false if it was already present.
    pub fn insert(&mut self, id: Uuid) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity
            && let Some(evicted) = self.order.pop_front()
        {
            self.seen.remove(&evicted);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
