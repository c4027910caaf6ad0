//! Hand lifecycle for a room: dealing, the action pipeline, betting-round
//! progression, phase advancement, timeout arbitration and settlement.
//!
//! Everything here runs on the room's serial executor; the sequence
//! {validate, mutate, stamp version, compute events} is atomic from the
//! room's perspective.

use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::game::constants::{BOARD_SIZE, FLOP_SIZE, HOLE_CARDS_PER_PLAYER, MIN_PLAYERS_TO_START};
use crate::game::engine;
use crate::game::entities::{
    ActionKind, ActionRecord, ActionRequest, Chips, GameState, Phase, Player, PlayerId,
    PlayerStatus, SeatIndex,
};
use crate::game::eval;
use crate::net::errors::GameError;
use crate::net::messages::{
    AwardView, PotResultView, PotView, RoomView, ServerEvent, ShowdownCardsView,
};
use crate::room::messages::{Outgoing, Recipient};
use crate::room::state::{Deadline, DeadlineKind, Room};

impl Room {
    /// Host command: begin the game. Requires at least two funded seats
    /// and every seated non-host player to be ready.
    pub fn start_game(&mut self, player_id: PlayerId) -> Result<Vec<Outgoing>, GameError> {
        if !self.members.contains_key(&player_id) {
            return Err(GameError::NotInRoom);
        }
        if player_id != self.host_id {
            return Err(GameError::NotHost);
        }
        if self.is_playing {
            return Err(GameError::GameAlreadyStarted);
        }
        if self.eligible_seats().len() < MIN_PLAYERS_TO_START {
            return Err(GameError::NotEnoughPlayers);
        }
        if !self.all_ready() {
            return Err(GameError::PlayersNotReady);
        }
        self.is_playing = true;
        self.start_hand()
    }

    /// Deal a fresh hand: rotate the button, post blinds, deal hole cards
    /// and hand the action to the first actor.
    pub(crate) fn start_hand(&mut self) -> Result<Vec<Outgoing>, GameError> {
        let seats = self.eligible_seats();
        if seats.len() < MIN_PLAYERS_TO_START {
            return Err(GameError::NotEnoughPlayers);
        }

        let mut deck = self.next_deck();
        // The very first hand puts the button on the lowest eligible seat;
        // afterwards it rotates past busted and vacated seats.
        let prev_dealer = self.game.as_ref().map(|g| g.dealer_seat);
        let Some(dealer) = engine::next_dealer(prev_dealer, &seats) else {
            return Err(GameError::NotEnoughPlayers);
        };
        let positions = engine::hand_positions(dealer, &seats);
        let hand_number = self.game.as_ref().map_or(0, |g| g.hand_number) + 1;

        for seat in self.occupied_seats() {
            let participating = seats.contains(&seat);
            if let Some(player) = self.player_at_seat_mut(seat) {
                player.reset_for_new_hand();
                player.status = if participating {
                    PlayerStatus::Active
                } else {
                    PlayerStatus::Eliminated
                };
                player.is_dealer = seat == dealer;
            }
        }

        let (small_blind, big_blind) = (self.config.small_blind, self.config.big_blind);
        if let Some(player) = self.player_at_seat_mut(positions.small_blind) {
            player.deduct_chips(small_blind);
        }
        if let Some(player) = self.player_at_seat_mut(positions.big_blind) {
            player.deduct_chips(big_blind);
        }

        // Hole cards go out one per pass, starting left of the button.
        let order = engine::seats_after(dealer, &seats);
        for _ in 0..HOLE_CARDS_PER_PLAYER {
            for &seat in &order {
                let card = deck.deal_card();
                if let Some(player) = self.player_at_seat_mut(seat) {
                    player.hole_cards.push(card);
                }
            }
        }

        let pots = engine::build_pots(&self.contributions());
        let hand_id = Uuid::new_v4();
        self.game = Some(GameState {
            phase: Phase::PreFlop,
            community: Vec::with_capacity(BOARD_SIZE),
            pots,
            current_seat: None,
            dealer_seat: dealer,
            small_blind_seat: positions.small_blind,
            big_blind_seat: positions.big_blind,
            current_bet: big_blind,
            min_raise: big_blind,
            round_index: 0,
            hand_id,
            round_id: Uuid::new_v4(),
            hand_number,
            deck,
            history: Vec::new(),
            turn_deadline_ms: None,
        });

        log::info!(
            "room {}: hand {} dealt, button at seat {}",
            self.id,
            hand_number,
            dealer
        );

        let room = RoomView::project(self);
        let mut events = vec![self.emit(
            Recipient::All,
            ServerEvent::GameStarted {
                hand_id,
                hand_number,
                room,
            },
        )];
        for &seat in &order {
            if let Some(player) = self.player_at_seat(seat) {
                let (player_id, cards) = (player.id, player.hole_cards.clone());
                events.push(self.emit(
                    Recipient::Player(player_id),
                    ServerEvent::DealCards { hand_id, cards },
                ));
            }
        }

        // First actor: first still-acting seat from the positional pick
        // (a blind post can already have someone all-in).
        if let Some(actor) = self.find_actor_from(positions.first_actor) {
            events.push(self.arm_turn_timer(actor));
        } else if let Ok(more) = self.advance_phase() {
            events.extend(more);
        }
        Ok(events)
    }

    /// Validate and execute a client action. The pipeline order is fixed:
    /// duplicate request, stale round, turn ownership, actionability, then
    /// per-action semantics. The first failure returns with no mutation.
    pub fn apply_action(
        &mut self,
        player_id: PlayerId,
        request: &ActionRequest,
    ) -> Result<Vec<Outgoing>, GameError> {
        if !self.members.contains_key(&player_id) {
            return Err(GameError::NotInRoom);
        }
        let game = self.game.as_ref().ok_or(GameError::CannotAct)?;
        if game.phase == Phase::Idle || game.phase == Phase::Showdown {
            return Err(GameError::CannotAct);
        }
        if self.processed_requests.contains(&request.request_id) {
            return Err(GameError::DuplicateRequest);
        }
        if request.round_index != game.round_index {
            return Err(GameError::StaleRequest);
        }
        let events = self.act(player_id, request.kind, request.amount, false)?;
        self.processed_requests.insert(request.request_id);
        Ok(events)
    }

    /// The room's single timer fired.
    pub fn handle_deadline(&mut self) -> Vec<Outgoing> {
        let Some(deadline) = self.deadline.take() else {
            return Vec::new();
        };
        match deadline.kind {
            DeadlineKind::TurnTimeout => self.timeout_current_actor(),
            DeadlineKind::NextHand => {
                if !self.is_playing {
                    return Vec::new();
                }
                match self.start_hand() {
                    Ok(events) => events,
                    Err(err) => {
                        log::error!("room {}: next hand aborted: {err}", self.id);
                        self.is_playing = false;
                        let room = RoomView::project(self);
                        vec![self.emit(
                            Recipient::All,
                            ServerEvent::GameEnded {
                                winner_id: None,
                                room,
                            },
                        )]
                    }
                }
            }
        }
    }

    /// Auto-act for the current player: check when nothing is owed,
    /// otherwise fold. Disconnection does not pause this.
    fn timeout_current_actor(&mut self) -> Vec<Outgoing> {
        let Some(game) = self.game.as_ref() else {
            return Vec::new();
        };
        let Some(seat) = game.current_seat else {
            return Vec::new();
        };
        let owes = game.current_bet;
        let Some(player) = self.player_at_seat(seat) else {
            return Vec::new();
        };
        let kind = if player.current_bet == owes {
            ActionKind::Check
        } else {
            ActionKind::Fold
        };
        let player_id = player.id;
        log::warn!(
            "room {}: seat {seat} timed out, auto-{kind}",
            self.id
        );
        self.act(player_id, kind, None, true).unwrap_or_default()
    }

    /// Execute one action for the player whose turn it is. Shared by the
    /// client path and the timeout path.
    fn act(
        &mut self,
        player_id: PlayerId,
        kind: ActionKind,
        amount: Option<Chips>,
        timed_out: bool,
    ) -> Result<Vec<Outgoing>, GameError> {
        let Some(game) = self.game.as_mut() else {
            return Err(GameError::CannotAct);
        };
        let Some(seat) = game.current_seat else {
            return Err(GameError::NotYourTurn);
        };
        let Some(player) = self.members.get_mut(&player_id) else {
            return Err(GameError::NotInRoom);
        };
        if player.seat != Some(seat) {
            return Err(GameError::NotYourTurn);
        }
        if !player.can_act() || !player.is_current_turn {
            return Err(GameError::CannotAct);
        }

        let prev_bet = game.current_bet;
        let mut paid = 0;
        let mut reopened = false;
        match kind {
            ActionKind::Fold => {
                player.fold();
            }
            ActionKind::Check => {
                if player.current_bet != game.current_bet {
                    return Err(GameError::CannotCheckMustCall);
                }
                player.has_acted = true;
            }
            ActionKind::Call => {
                let owed = game.current_bet - player.current_bet;
                if owed == 0 {
                    return Err(GameError::NothingToCall);
                }
                // A short call is an implicit all-in.
                paid = player.deduct_chips(owed);
                player.has_acted = true;
            }
            ActionKind::Raise => {
                // `amount` is the new total bet target.
                let Some(target) = amount else {
                    return Err(GameError::BadMessage);
                };
                let minimum = game.current_bet + game.min_raise;
                if target <= game.current_bet {
                    return Err(GameError::RaiseTooSmall { minimum });
                }
                let increment = target - player.current_bet;
                if increment > player.chips {
                    return Err(GameError::NotEnoughChips);
                }
                // Below the minimum is only legal as a whole-stack shove.
                if target < minimum && increment < player.chips {
                    return Err(GameError::RaiseTooSmall { minimum });
                }
                paid = player.deduct_chips(increment);
                game.current_bet = target;
                let raise_by = target - prev_bet;
                if raise_by >= game.min_raise {
                    game.min_raise = raise_by;
                    reopened = true;
                }
                player.has_acted = true;
            }
            ActionKind::AllIn => {
                if player.chips == 0 {
                    return Err(GameError::NotEnoughChips);
                }
                paid = player.all_in();
                let total = player.current_bet;
                if total > game.current_bet {
                    let raise_by = total - prev_bet;
                    game.current_bet = total;
                    // An undersized all-in lifts the bet but does not
                    // reopen the action for players who already acted.
                    if raise_by >= game.min_raise {
                        game.min_raise = raise_by;
                        reopened = true;
                    }
                }
                player.has_acted = true;
            }
        }

        player.is_current_turn = false;
        let round_id = game.round_id;
        game.history.push(ActionRecord {
            player_id,
            seat,
            kind,
            paid,
            phase: game.phase,
            round_index: game.round_index,
            timed_out,
            at: Utc::now(),
        });
        game.current_seat = None;
        game.turn_deadline_ms = None;
        let current_bet = game.current_bet;

        if reopened {
            for other in self.members.values_mut() {
                if other.id != player_id && other.can_act() {
                    other.has_acted = false;
                }
            }
        }
        self.deadline = None;

        let pot_total = self.live_pot_total();
        let mut events = vec![self.emit(
            Recipient::All,
            ServerEvent::PlayerActed {
                player_id,
                seat_index: seat,
                action: kind,
                paid,
                current_bet,
                pot_total,
                timed_out,
                round_id,
            },
        )];

        if self.non_folded_in_hand().len() <= 1 {
            events.extend(self.settle_single_survivor());
        } else if self.betting_round_complete() {
            events.extend(self.advance_phase()?);
        } else if let Some(next) = self.find_actor_after(seat) {
            events.push(self.arm_turn_timer(next));
        } else {
            // Everyone left to speak is all-in; run the board out.
            events.extend(self.advance_phase()?);
        }
        Ok(events)
    }

    /// Betting-round completion: one survivor, everyone all-in, or all
    /// remaining actors matched the bet after acting.
    fn betting_round_complete(&self) -> bool {
        let Some(game) = &self.game else {
            return true;
        };
        if self.non_folded_in_hand().len() <= 1 {
            return true;
        }
        let actionable = self.actionable_in_hand();
        if actionable.is_empty() {
            return true;
        }
        actionable
            .iter()
            .all(|p| p.has_acted && p.current_bet == game.current_bet)
    }

    /// Close the current betting round: roll bets into the pot structure,
    /// then either settle (river or all-in runout) or deal the next
    /// street and restart the action.
    fn advance_phase(&mut self) -> Result<Vec<Outgoing>, GameError> {
        let pots = engine::build_pots(&self.contributions());
        let Some(game) = self.game.as_mut() else {
            return Ok(Vec::new());
        };
        game.pots = pots;
        let phase = game.phase;

        if phase == Phase::River {
            return Ok(self.settle_showdown());
        }

        let big_blind = self.config.big_blind;
        for player in self.members.values_mut() {
            if player.is_seated() {
                player.reset_for_new_round();
            }
        }

        // With at most one player able to act there is no more betting;
        // deal every remaining street in one pass and go to showdown.
        let fast_forward = self.actionable_in_hand().len() <= 1;
        let Some(game) = self.game.as_mut() else {
            return Ok(Vec::new());
        };
        game.current_bet = 0;
        game.min_raise = big_blind;
        game.round_index += 1;
        game.round_id = Uuid::new_v4();

        if fast_forward {
            while game.community.len() < BOARD_SIZE {
                game.deck.burn();
                let take = if game.community.is_empty() { FLOP_SIZE } else { 1 };
                for _ in 0..take {
                    let card = game.deck.deal_card();
                    game.community.push(card);
                }
            }
            game.phase = Phase::River;
            let event = self.phase_event();
            let mut events = vec![event];
            events.extend(self.settle_showdown());
            return Ok(events);
        }

        let next = phase.next();
        game.deck.burn();
        let take = next.board_size() - game.community.len();
        for _ in 0..take {
            let card = game.deck.deal_card();
            game.community.push(card);
        }
        game.phase = next;
        let dealer = game.dealer_seat;

        let mut events = vec![self.phase_event()];
        if let Some(actor) = self.find_actor_after(dealer) {
            events.push(self.arm_turn_timer(actor));
        } else {
            events.extend(self.advance_phase()?);
        }
        Ok(events)
    }

    fn phase_event(&mut self) -> Outgoing {
        let (phase, community, round_id, pots) = match &self.game {
            Some(game) => (
                game.phase,
                game.community.clone(),
                game.round_id,
                game.pots
                    .iter()
                    .map(|p| PotView {
                        amount: p.amount,
                        eligible: p.eligible.iter().copied().collect(),
                    })
                    .collect(),
            ),
            None => (Phase::Idle, Vec::new(), Uuid::nil(), Vec::new()),
        };
        self.emit(
            Recipient::All,
            ServerEvent::PhaseAdvanced {
                phase,
                community,
                round_id,
                pots,
            },
        )
    }

    /// Everyone else folded: the last player standing collects every pot
    /// without showing.
    fn settle_single_survivor(&mut self) -> Vec<Outgoing> {
        let pots = engine::build_pots(&self.contributions());
        let survivor = self
            .members
            .values()
            .find(|p| self.in_hand(p) && !p.is_folded)
            .map(|p| p.id);
        let Some(winner_id) = survivor else {
            return self.finish_hand();
        };
        let total: Chips = pots.iter().map(|p| p.amount).sum();
        let pot_results: Vec<PotResultView> = pots
            .iter()
            .enumerate()
            .map(|(pot_index, pot)| PotResultView {
                pot_index,
                amount: pot.amount,
                awards: vec![AwardView {
                    player_id: winner_id,
                    amount: pot.amount,
                }],
            })
            .collect();
        if let Some(player) = self.members.get_mut(&winner_id) {
            player.add_chips(total);
        }
        let hand_id = self.game.as_ref().map_or_else(Uuid::nil, |g| g.hand_id);
        log::info!("room {}: hand folded out, {total} chips to {winner_id}", self.id);

        let room = RoomView::project(self);
        let mut events = vec![self.emit(
            Recipient::All,
            ServerEvent::HandResult {
                hand_id,
                pots: pot_results,
                showdown_cards: Vec::new(),
                room,
            },
        )];
        events.extend(self.finish_hand());
        events
    }

    /// Showdown: complete the board, score every unfolded participant,
    /// award each pot and disclose the shown cards.
    fn settle_showdown(&mut self) -> Vec<Outgoing> {
        self.deadline = None;
        let pots = engine::build_pots(&self.contributions());
        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };
        while game.community.len() < BOARD_SIZE {
            game.deck.burn();
            let take = if game.community.is_empty() { FLOP_SIZE } else { 1 };
            for _ in 0..take {
                let card = game.deck.deal_card();
                game.community.push(card);
            }
        }
        game.phase = Phase::Showdown;
        game.current_seat = None;
        game.turn_deadline_ms = None;
        game.pots = pots.clone();
        let community = game.community.clone();
        let hand_id = game.hand_id;

        let mut scores = HashMap::new();
        let mut seat_of = HashMap::new();
        let mut showdown_cards = Vec::new();
        for player in self.members.values() {
            if !self.in_hand(player) {
                continue;
            }
            if let Some(seat) = player.seat {
                seat_of.insert(player.id, seat);
            }
            if player.is_folded {
                continue;
            }
            let mut cards = player.hole_cards.clone();
            cards.extend_from_slice(&community);
            let value = eval::best_hand(&cards);
            showdown_cards.push(ShowdownCardsView {
                player_id: player.id,
                cards: player.hole_cards.clone(),
                category: Some(value.category),
            });
            scores.insert(player.id, value);
        }
        showdown_cards.sort_by_key(|s| seat_of.get(&s.player_id).copied());

        let awards = engine::award_pots(&pots, &scores, &seat_of);
        let mut pot_results = Vec::with_capacity(pots.len());
        for (pot_index, (pot, awards)) in pots.iter().zip(&awards).enumerate() {
            for award in awards {
                if let Some(player) = self.members.get_mut(&award.player_id) {
                    player.add_chips(award.amount);
                }
            }
            pot_results.push(PotResultView {
                pot_index,
                amount: pot.amount,
                awards: awards
                    .iter()
                    .map(|a| AwardView {
                        player_id: a.player_id,
                        amount: a.amount,
                    })
                    .collect(),
            });
        }
        log::info!(
            "room {}: showdown settled {} pot(s) across {} player(s)",
            self.id,
            pots.len(),
            scores.len()
        );

        let room = RoomView::project(self);
        let mut events = vec![self.emit(
            Recipient::All,
            ServerEvent::HandResult {
                hand_id,
                pots: pot_results,
                showdown_cards,
                room,
            },
        )];
        events.extend(self.finish_hand());
        events
    }

    /// Post-settlement bookkeeping: eliminations, host succession, and
    /// either the end of the game or the pause before the next deal.
    fn finish_hand(&mut self) -> Vec<Outgoing> {
        self.deadline = None;
        for player in self.members.values_mut() {
            if !player.is_seated() {
                continue;
            }
            player.reset_for_new_hand();
            player.status = if player.chips == 0 {
                PlayerStatus::Eliminated
            } else {
                PlayerStatus::Waiting
            };
        }
        if let Some(game) = self.game.as_mut() {
            game.phase = Phase::Idle;
            game.community.clear();
            game.pots.clear();
            game.current_seat = None;
            game.turn_deadline_ms = None;
        }

        let mut events = Vec::new();
        let host_eliminated = self
            .members
            .get(&self.host_id)
            .is_some_and(|h| h.status == PlayerStatus::Eliminated);
        if host_eliminated {
            let successor = self
                .occupied_seats()
                .into_iter()
                .filter_map(|seat| self.player_at_seat(seat))
                .find(|p| p.status != PlayerStatus::Eliminated)
                .map(|p| p.id);
            if let Some(new_host) = successor
                && let Some(event) = self.set_host(new_host)
            {
                events.push(event);
            }
        }

        let funded: Vec<PlayerId> = self
            .members
            .values()
            .filter(|p| p.is_seated() && p.chips > 0)
            .map(|p| p.id)
            .collect();
        if funded.len() <= 1 {
            self.is_playing = false;
            log::info!("room {}: game over", self.id);
            let room = RoomView::project(self);
            events.push(self.emit(
                Recipient::All,
                ServerEvent::GameEnded {
                    winner_id: funded.first().copied(),
                    room,
                },
            ));
            return events;
        }

        self.deadline = Some(Deadline {
            at: Instant::now() + Duration::from_millis(self.config.inter_hand_delay_ms),
            kind: DeadlineKind::NextHand,
        });
        let room = RoomView::project(self);
        events.push(self.emit(
            Recipient::All,
            ServerEvent::SyncState {
                room,
                my_cards: None,
            },
        ));
        events
    }

    // --- turn management -------------------------------------------------

    /// Give the turn to `seat` and arm the action timer.
    fn arm_turn_timer(&mut self, seat: SeatIndex) -> Outgoing {
        let timeout = Duration::from_secs(self.config.turn_timeout_secs);
        let deadline_ms = Utc::now().timestamp_millis() + timeout.as_millis() as i64;
        self.deadline = Some(Deadline {
            at: Instant::now() + timeout,
            kind: DeadlineKind::TurnTimeout,
        });
        let mut player_id = Uuid::nil();
        if let Some(player) = self.player_at_seat_mut(seat) {
            player.is_current_turn = true;
            player_id = player.id;
        }
        let mut round_id = Uuid::nil();
        if let Some(game) = self.game.as_mut() {
            game.current_seat = Some(seat);
            game.turn_deadline_ms = Some(deadline_ms);
            round_id = game.round_id;
        }
        self.emit(
            Recipient::All,
            ServerEvent::PlayerTurn {
                player_id,
                seat_index: seat,
                round_id,
                deadline_ms,
            },
        )
    }

    /// First seat at or after `preferred` (cyclically) that still needs to
    /// act this round.
    fn find_actor_from(&self, preferred: SeatIndex) -> Option<SeatIndex> {
        let seats = self.hand_seats();
        let mut order = engine::seats_after(preferred, &seats);
        if order.last() == Some(&preferred) {
            order.rotate_right(1);
        }
        order.into_iter().find(|&s| self.seat_needs_action(s))
    }

    /// First seat strictly after `pivot` that still needs to act.
    fn find_actor_after(&self, pivot: SeatIndex) -> Option<SeatIndex> {
        let seats = self.hand_seats();
        engine::seats_after(pivot, &seats)
            .into_iter()
            .find(|&s| self.seat_needs_action(s))
    }

    fn seat_needs_action(&self, seat: SeatIndex) -> bool {
        let Some(game) = &self.game else {
            return false;
        };
        self.player_at_seat(seat)
            .is_some_and(|p| p.can_act() && (!p.has_acted || p.current_bet < game.current_bet))
    }

    // --- hand bookkeeping ------------------------------------------------

    fn in_hand(&self, player: &Player) -> bool {
        matches!(
            player.status,
            PlayerStatus::Active | PlayerStatus::Folded | PlayerStatus::AllIn
        )
    }

    fn hand_seats(&self) -> Vec<SeatIndex> {
        self.occupied_seats()
            .into_iter()
            .filter(|&seat| {
                self.player_at_seat(seat)
                    .is_some_and(|p| self.in_hand(p))
            })
            .collect()
    }

    fn non_folded_in_hand(&self) -> Vec<&Player> {
        self.members
            .values()
            .filter(|p| self.in_hand(p) && !p.is_folded)
            .collect()
    }

    fn actionable_in_hand(&self) -> Vec<&Player> {
        self.members
            .values()
            .filter(|p| self.in_hand(p) && !p.is_folded && !p.is_all_in)
            .collect()
    }

    /// Every contribution to the current hand, folded players included.
    fn contributions(&self) -> Vec<engine::Contribution> {
        self.members
            .values()
            .filter(|p| p.total_bet_this_hand > 0)
            .map(|p| engine::Contribution {
                player_id: p.id,
                seat: p.seat.unwrap_or(usize::MAX),
                amount: p.total_bet_this_hand,
                folded: p.is_folded,
            })
            .collect()
    }

    /// Live pot size: settled pot layers plus bets still on the table.
    pub fn live_pot_total(&self) -> Chips {
        self.members
            .values()
            .map(|p| p.total_bet_this_hand)
            .sum()
    }
}
