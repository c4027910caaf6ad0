//! Room state: membership, seating, host designation and version
//! stamping. The hand lifecycle lives in [`crate::game::controller`].

use chrono::{DateTime, Utc};
use rand::{SeedableRng, rngs::StdRng};
use std::collections::{HashMap, VecDeque};
use tokio::time::Instant;

use crate::game::entities::{
    Chips, ConnectionId, Deck, GameState, Nickname, Phase, Player, PlayerId, PlayerStatus,
    RequestLog, SeatIndex,
};
use crate::net::errors::GameError;
use crate::net::messages::{Frame, RoomView, ServerEvent};
use crate::room::config::RoomConfig;
use crate::room::messages::{Outgoing, Recipient, RoomSummary};

/// What the room's single armed timer means when it fires.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeadlineKind {
    /// The current actor ran out of time; auto-check or auto-fold.
    TurnTimeout,
    /// The inter-hand pause elapsed; deal the next hand.
    NextHand,
}

/// At most one deadline is armed per room.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    pub at: Instant,
    pub kind: DeadlineKind,
}

/// A room owns its players, seat map and game state exclusively. All
/// mutation happens on the room's serial executor, so none of this is
/// synchronized.
#[derive(Debug)]
pub struct Room {
    pub id: String,
    pub config: RoomConfig,
    pub host_id: PlayerId,
    pub(crate) members: HashMap<PlayerId, Player>,
    /// Insertion order, used for host succession.
    pub(crate) join_order: Vec<PlayerId>,
    /// Seat map; indices are seat positions.
    pub(crate) seats: Vec<Option<PlayerId>>,
    pub game: Option<GameState>,
    pub is_playing: bool,
    pub(crate) state_version: u64,
    pub(crate) processed_requests: RequestLog,
    pub(crate) rng: StdRng,
    /// Pre-arranged decks consumed before falling back to shuffling.
    pub(crate) stacked_decks: VecDeque<Deck>,
    pub deadline: Option<Deadline>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Create a room with its host as the first member.
    pub fn create(
        id: String,
        config: RoomConfig,
        host_nickname: Nickname,
        connection: ConnectionId,
    ) -> (Self, PlayerId, Vec<Outgoing>) {
        Self::create_with_rng(id, config, host_nickname, connection, StdRng::from_os_rng())
    }

    /// Deterministic variant for tests and replay: a fixed RNG seed makes
    /// every shuffle reproducible.
    pub fn with_seed(
        id: String,
        config: RoomConfig,
        host_nickname: Nickname,
        connection: ConnectionId,
        seed: u64,
    ) -> (Self, PlayerId, Vec<Outgoing>) {
        Self::create_with_rng(
            id,
            config,
            host_nickname,
            connection,
            StdRng::seed_from_u64(seed),
        )
    }

    fn create_with_rng(
        id: String,
        config: RoomConfig,
        host_nickname: Nickname,
        connection: ConnectionId,
        rng: StdRng,
    ) -> (Self, PlayerId, Vec<Outgoing>) {
        let mut host = Player::new(host_nickname, connection);
        host.is_host = true;
        let host_id = host.id;
        let seats = vec![None; config.max_players];
        let mut room = Self {
            id: id.clone(),
            config,
            host_id,
            members: HashMap::from([(host_id, host)]),
            join_order: vec![host_id],
            seats,
            game: None,
            is_playing: false,
            state_version: 0,
            processed_requests: RequestLog::default(),
            rng,
            stacked_decks: VecDeque::new(),
            deadline: None,
            created_at: Utc::now(),
        };
        let events = vec![room.emit(
            Recipient::Connection(connection),
            ServerEvent::RoomCreated {
                room_id: id,
                player_id: host_id,
                room: RoomView::project(&room),
            },
        )];
        (room, host_id, events)
    }

    /// Queue a deck to be used for the next hand instead of shuffling.
    pub fn stack_deck(&mut self, deck: Deck) {
        self.stacked_decks.push_back(deck);
    }

    // --- accessors -------------------------------------------------------

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.join_order.iter().filter_map(|id| self.members.get(id))
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.members.get(id)
    }

    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.members.get_mut(id)
    }

    pub fn player_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn state_version(&self) -> u64 {
        self.state_version
    }

    /// Occupied seats, ascending.
    pub fn occupied_seats(&self) -> Vec<SeatIndex> {
        self.seats
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|_| i))
            .collect()
    }

    pub fn player_at_seat(&self, seat: SeatIndex) -> Option<&Player> {
        self.seats
            .get(seat)
            .copied()
            .flatten()
            .and_then(|id| self.members.get(&id))
    }

    pub(crate) fn player_at_seat_mut(&mut self, seat: SeatIndex) -> Option<&mut Player> {
        let id = self.seats.get(seat).copied().flatten()?;
        self.members.get_mut(&id)
    }

    pub fn connection_of(&self, id: &PlayerId) -> Option<ConnectionId> {
        self.members.get(id).and_then(|p| p.connection)
    }

    pub fn player_by_connection(&self, connection: &ConnectionId) -> Option<PlayerId> {
        self.members
            .values()
            .find(|p| p.connection == Some(*connection))
            .map(|p| p.id)
    }

    /// Σ chips + live contributions, the conserved quantity within a hand.
    pub fn table_total(&self) -> Chips {
        self.members
            .values()
            .map(|p| p.chips + p.total_bet_this_hand)
            .sum()
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.id.clone(),
            player_count: self.members.len(),
            seated_count: self.occupied_seats().len(),
            is_playing: self.is_playing,
            hand_number: self.game.as_ref().map_or(0, |g| g.hand_number),
        }
    }

    /// Stamp the next state version onto an event. Every externally
    /// visible transition goes through here, which keeps versions
    /// strictly increasing.
    pub(crate) fn emit(&mut self, recipient: Recipient, event: ServerEvent) -> Outgoing {
        self.state_version += 1;
        Outgoing {
            recipient,
            frame: Frame {
                state_version: self.state_version,
                event,
            },
        }
    }

    fn emit_room_updated(&mut self) -> Outgoing {
        let room = RoomView::project(self);
        self.emit(Recipient::All, ServerEvent::RoomUpdated { room })
    }

    // --- membership ------------------------------------------------------

    /// Join as a new spectator, or rebind an existing player's connection
    /// when `existing_player_id` matches a known member (reconnect). A
    /// reconnect changes no player state and leaves timers untouched.
    pub fn join(
        &mut self,
        nickname: Nickname,
        connection: ConnectionId,
        existing_player_id: Option<PlayerId>,
    ) -> Result<(PlayerId, bool, Vec<Outgoing>), GameError> {
        if let Some(player_id) = existing_player_id {
            let player = self
                .members
                .get_mut(&player_id)
                .ok_or(GameError::TargetNotFound)?;
            player.connection = Some(connection);
            log::info!("room {}: {} reconnected", self.id, player.nickname);
            let events = vec![self.reconnected_event(player_id, connection), self.emit_room_updated()];
            return Ok((player_id, true, events));
        }

        let player = Player::new(nickname, connection);
        let player_id = player.id;
        log::info!("room {}: {} joined", self.id, player.nickname);
        self.members.insert(player_id, player);
        self.join_order.push(player_id);

        let room = RoomView::project(self);
        let joined = self.emit(
            Recipient::Connection(connection),
            ServerEvent::RoomJoined {
                room_id: self.id.clone(),
                player_id,
                room,
            },
        );
        let player_view =
            crate::net::messages::PlayerView::project(&self.members[&player_id]);
        let announced = self.emit(
            Recipient::All,
            ServerEvent::PlayerJoined {
                player: player_view,
            },
        );
        Ok((player_id, false, vec![joined, announced]))
    }

    /// Build the targeted reconnect snapshot, including the player's own
    /// hole cards when a hand is live.
    pub(crate) fn reconnected_event(
        &mut self,
        player_id: PlayerId,
        connection: ConnectionId,
    ) -> Outgoing {
        let player = &self.members[&player_id];
        let my_cards = (!player.hole_cards.is_empty()).then(|| player.hole_cards.clone());
        let (hand_id, round_id) = match &self.game {
            Some(game) if game.phase != Phase::Idle => (Some(game.hand_id), Some(game.round_id)),
            _ => (None, None),
        };
        let room = RoomView::project(self);
        self.emit(
            Recipient::Connection(connection),
            ServerEvent::Reconnected {
                room_id: self.id.clone(),
                player_id,
                room,
                my_cards,
                hand_id,
                round_id,
            },
        )
    }

    /// Seat a member. Grants the configured starting stack.
    pub fn sit_down(
        &mut self,
        player_id: PlayerId,
        seat: SeatIndex,
    ) -> Result<Vec<Outgoing>, GameError> {
        if seat >= self.config.max_players {
            return Err(GameError::InvalidSeatIndex);
        }
        let player = self.members.get(&player_id).ok_or(GameError::NotInRoom)?;
        if player.is_seated() {
            return Err(GameError::AlreadySeated);
        }
        if self.seats[seat].is_some() {
            return Err(GameError::SeatOccupied);
        }
        let stake = self.config.initial_chips;
        self.seats[seat] = Some(player_id);
        if let Some(player) = self.members.get_mut(&player_id) {
            player.sit_down(seat, stake);
        }
        let sat = self.emit(
            Recipient::All,
            ServerEvent::PlayerSat {
                player_id,
                seat_index: seat,
            },
        );
        Ok(vec![sat, self.emit_room_updated()])
    }

    /// Stand up, forfeiting the stack. Rejected while a game is running.
    pub fn stand_up(&mut self, player_id: PlayerId) -> Result<Vec<Outgoing>, GameError> {
        let player = self.members.get(&player_id).ok_or(GameError::NotInRoom)?;
        let Some(seat) = player.seat else {
            return Err(GameError::NotSeated);
        };
        if self.is_playing {
            return Err(GameError::GameInProgress);
        }
        self.seats[seat] = None;
        if let Some(player) = self.members.get_mut(&player_id) {
            player.stand_up();
        }
        let stood = self.emit(Recipient::All, ServerEvent::PlayerStood { player_id });
        Ok(vec![stood, self.emit_room_updated()])
    }

    /// Mark a seated player ready for the next hand. The host is
    /// implicitly ready and never needs this.
    pub fn set_ready(&mut self, player_id: PlayerId) -> Result<Vec<Outgoing>, GameError> {
        let player = self.members.get_mut(&player_id).ok_or(GameError::NotInRoom)?;
        if !player.is_seated() {
            return Err(GameError::NotSeated);
        }
        player.is_ready = true;
        let changed = self.emit(
            Recipient::All,
            ServerEvent::ReadyStateChanged {
                player_id,
                is_ready: true,
            },
        );
        Ok(vec![changed])
    }

    /// Whether every seated non-host player has marked ready.
    pub fn all_ready(&self) -> bool {
        self.members
            .values()
            .filter(|p| p.is_seated() && p.id != self.host_id)
            .all(|p| p.is_ready)
    }

    /// Host-only removal of another member, outside of a running game.
    pub fn kick(
        &mut self,
        requester: PlayerId,
        target: PlayerId,
    ) -> Result<Vec<Outgoing>, GameError> {
        if !self.members.contains_key(&requester) {
            return Err(GameError::NotInRoom);
        }
        if requester != self.host_id {
            return Err(GameError::NotHost);
        }
        if self.is_playing {
            return Err(GameError::GameInProgress);
        }
        if requester == target {
            return Err(GameError::CannotKickSelf);
        }
        if !self.members.contains_key(&target) {
            return Err(GameError::TargetNotFound);
        }

        let mut events = Vec::new();
        // The kicked player learns first, with the clear-session flag set.
        if let Some(connection) = self.connection_of(&target) {
            events.push(self.emit(
                Recipient::Connection(connection),
                ServerEvent::PlayerKicked {
                    player_id: target,
                    should_clear_session: true,
                },
            ));
        }
        self.remove_member(target);
        events.push(self.emit(
            Recipient::All,
            ServerEvent::PlayerKicked {
                player_id: target,
                should_clear_session: false,
            },
        ));
        events.push(self.emit_room_updated());
        Ok(events)
    }

    /// Leave the room. A seated player cannot leave mid-game; they can
    /// only disconnect. Returns the events plus whether the room emptied.
    pub fn leave(&mut self, player_id: PlayerId) -> Result<(Vec<Outgoing>, bool), GameError> {
        let player = self.members.get(&player_id).ok_or(GameError::NotInRoom)?;
        if self.is_playing && player.is_seated() {
            return Err(GameError::GameInProgress);
        }
        let was_host = player_id == self.host_id;
        log::info!("room {}: {} left", self.id, player.nickname);
        self.remove_member(player_id);

        let mut events = vec![self.emit(Recipient::All, ServerEvent::PlayerLeft { player_id })];
        if self.is_empty() {
            return Ok((events, true));
        }
        if was_host && let Some(event) = self.transfer_host_to_next() {
            events.push(event);
        }
        events.push(self.emit_room_updated());
        Ok((events, false))
    }

    /// Clear the binding for a dropped connection. Player state is kept
    /// and any armed timer keeps running.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Vec<Outgoing> {
        let Some(player_id) = self.player_by_connection(&connection) else {
            return Vec::new();
        };
        if let Some(player) = self.members.get_mut(&player_id) {
            player.connection = None;
            log::debug!("room {}: {} disconnected", self.id, player.nickname);
        }
        vec![self.emit_room_updated()]
    }

    fn remove_member(&mut self, player_id: PlayerId) {
        if let Some(player) = self.members.remove(&player_id)
            && let Some(seat) = player.seat
        {
            self.seats[seat] = None;
        }
        self.join_order.retain(|id| *id != player_id);
    }

    /// Pass hostship to the earliest-joined remaining member.
    fn transfer_host_to_next(&mut self) -> Option<Outgoing> {
        let next = *self.join_order.first()?;
        self.set_host(next)
    }

    /// Pass hostship to a specific member.
    pub(crate) fn set_host(&mut self, new_host: PlayerId) -> Option<Outgoing> {
        if !self.members.contains_key(&new_host) {
            return None;
        }
        if let Some(old) = self.members.get_mut(&self.host_id) {
            old.is_host = false;
        }
        self.host_id = new_host;
        if let Some(player) = self.members.get_mut(&new_host) {
            player.is_host = true;
        }
        log::info!("room {}: host transferred to {}", self.id, new_host);
        Some(self.emit(
            Recipient::All,
            ServerEvent::HostTransferred {
                new_host_id: new_host,
            },
        ))
    }

    /// Pull the next deck: a stacked one if queued, otherwise a fresh
    /// shuffle from the room's RNG.
    pub(crate) fn next_deck(&mut self) -> Deck {
        self.stacked_decks
            .pop_front()
            .unwrap_or_else(|| Deck::shuffled(&mut self.rng))
    }

    /// Seats participating in the next hand: seated, funded, not
    /// eliminated.
    pub(crate) fn eligible_seats(&self) -> Vec<SeatIndex> {
        self.seats
            .iter()
            .enumerate()
            .filter_map(|(i, s)| {
                let id = (*s)?;
                let p = self.members.get(&id)?;
                (p.chips > 0 && p.status != PlayerStatus::Eliminated).then_some(i)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::messages::Recipient;
    use uuid::Uuid;

    fn new_room() -> (Room, PlayerId) {
        let (room, host_id, _) = Room::with_seed(
            "123456".to_string(),
            RoomConfig::default(),
            Nickname::new("host"),
            Uuid::new_v4(),
            1,
        );
        (room, host_id)
    }

    fn join(room: &mut Room, name: &str) -> PlayerId {
        let (id, is_reconnect, _) = room
            .join(Nickname::new(name), Uuid::new_v4(), None)
            .unwrap();
        assert!(!is_reconnect);
        id
    }

    #[test]
    fn test_create_room_mints_host() {
        let (room, host_id) = new_room();
        let host = room.player(&host_id).unwrap();
        assert!(host.is_host);
        assert_eq!(host.status, PlayerStatus::Spectating);
        assert_eq!(room.player_count(), 1);
    }

    #[test]
    fn test_join_and_sit() {
        let (mut room, _) = new_room();
        let alice = join(&mut room, "alice");
        room.sit_down(alice, 2).unwrap();
        let player = room.player(&alice).unwrap();
        assert_eq!(player.seat, Some(2));
        assert_eq!(player.chips, room.config.initial_chips);
        assert_eq!(player.status, PlayerStatus::Waiting);
        assert_eq!(room.occupied_seats(), vec![2]);
    }

    #[test]
    fn test_sit_rejections() {
        let (mut room, host_id) = new_room();
        let alice = join(&mut room, "alice");
        assert_eq!(
            room.sit_down(alice, 99).unwrap_err(),
            GameError::InvalidSeatIndex
        );
        room.sit_down(alice, 0).unwrap();
        assert_eq!(
            room.sit_down(host_id, 0).unwrap_err(),
            GameError::SeatOccupied
        );
        assert_eq!(
            room.sit_down(alice, 1).unwrap_err(),
            GameError::AlreadySeated
        );
        assert_eq!(
            room.sit_down(Uuid::new_v4(), 1).unwrap_err(),
            GameError::NotInRoom
        );
    }

    #[test]
    fn test_stand_up_forfeits_stack() {
        let (mut room, host_id) = new_room();
        room.sit_down(host_id, 0).unwrap();
        room.stand_up(host_id).unwrap();
        let host = room.player(&host_id).unwrap();
        assert_eq!(host.seat, None);
        assert_eq!(host.chips, 0);
        assert!(room.occupied_seats().is_empty());
    }

    #[test]
    fn test_stand_up_rejected_mid_game() {
        let (mut room, host_id) = new_room();
        room.sit_down(host_id, 0).unwrap();
        room.is_playing = true;
        assert_eq!(
            room.stand_up(host_id).unwrap_err(),
            GameError::GameInProgress
        );
    }

    #[test]
    fn test_reconnect_rebinds_connection_only() {
        let (mut room, _) = new_room();
        let alice = join(&mut room, "alice");
        room.sit_down(alice, 1).unwrap();
        let version_before = room.state_version();
        room.player_mut(&alice).unwrap().connection = None;

        let new_connection = Uuid::new_v4();
        let (id, is_reconnect, events) = room
            .join(Nickname::new("ignored"), new_connection, Some(alice))
            .unwrap();
        assert_eq!(id, alice);
        assert!(is_reconnect);
        assert_eq!(room.connection_of(&alice), Some(new_connection));
        // Reconnect snapshots go to the new connection only.
        assert!(matches!(
            events[0].recipient,
            Recipient::Connection(c) if c == new_connection
        ));
        assert!(room.state_version() > version_before);
        // Seat and stack untouched.
        assert_eq!(room.player(&alice).unwrap().seat, Some(1));
    }

    #[test]
    fn test_reconnect_unknown_player() {
        let (mut room, _) = new_room();
        let err = room
            .join(Nickname::new("ghost"), Uuid::new_v4(), Some(Uuid::new_v4()))
            .unwrap_err();
        assert_eq!(err, GameError::TargetNotFound);
        assert!(err.should_clear_session());
    }

    #[test]
    fn test_kick_requires_host_and_idle_game() {
        let (mut room, host_id) = new_room();
        let alice = join(&mut room, "alice");
        let bob = join(&mut room, "bob");

        assert_eq!(room.kick(alice, bob).unwrap_err(), GameError::NotHost);
        assert_eq!(
            room.kick(host_id, host_id).unwrap_err(),
            GameError::CannotKickSelf
        );
        room.is_playing = true;
        assert_eq!(
            room.kick(host_id, alice).unwrap_err(),
            GameError::GameInProgress
        );
        room.is_playing = false;
        room.kick(host_id, alice).unwrap();
        assert!(room.player(&alice).is_none());
        assert_eq!(room.player_count(), 2);
        let _ = bob;
    }

    #[test]
    fn test_leave_transfers_host_by_join_order() {
        let (mut room, host_id) = new_room();
        let alice = join(&mut room, "alice");
        let bob = join(&mut room, "bob");

        let (events, empty) = room.leave(host_id).unwrap();
        assert!(!empty);
        assert_eq!(room.host_id, alice);
        assert!(room.player(&alice).unwrap().is_host);
        assert!(!room.player(&bob).unwrap().is_host);
        assert!(events.iter().any(|e| matches!(
            e.frame.event,
            ServerEvent::HostTransferred { new_host_id } if new_host_id == alice
        )));
    }

    #[test]
    fn test_leave_empties_room() {
        let (mut room, host_id) = new_room();
        let (_, empty) = room.leave(host_id).unwrap();
        assert!(empty);
        assert!(room.is_empty());
    }

    #[test]
    fn test_seated_player_cannot_leave_mid_game() {
        let (mut room, host_id) = new_room();
        let alice = join(&mut room, "alice");
        room.sit_down(alice, 0).unwrap();
        room.is_playing = true;
        assert_eq!(room.leave(alice).unwrap_err(), GameError::GameInProgress);
        // Spectators may still leave.
        assert!(room.leave(host_id).is_ok());
    }

    #[test]
    fn test_disconnect_preserves_player() {
        let (mut room, _) = new_room();
        let connection = Uuid::new_v4();
        let (alice, _, _) = room
            .join(Nickname::new("alice"), connection, None)
            .unwrap();
        room.sit_down(alice, 0).unwrap();
        room.disconnect(connection);
        let player = room.player(&alice).unwrap();
        assert!(player.connection.is_none());
        assert_eq!(player.seat, Some(0));
        assert_eq!(player.chips, room.config.initial_chips);
    }

    #[test]
    fn test_ready_gate() {
        let (mut room, host_id) = new_room();
        let alice = join(&mut room, "alice");
        room.sit_down(host_id, 0).unwrap();
        room.sit_down(alice, 1).unwrap();
        // The host is implicitly ready; alice is not.
        assert!(!room.all_ready());
        room.set_ready(alice).unwrap();
        assert!(room.all_ready());
    }

    #[test]
    fn test_ready_requires_seat() {
        let (mut room, _) = new_room();
        let alice = join(&mut room, "alice");
        assert_eq!(room.set_ready(alice).unwrap_err(), GameError::NotSeated);
    }

    #[test]
    fn test_versions_strictly_increase() {
        let (mut room, host_id) = new_room();
        let mut last = room.state_version();
        let alice = join(&mut room, "alice");
        for events in [
            room.sit_down(host_id, 0).unwrap(),
            room.sit_down(alice, 1).unwrap(),
            room.set_ready(alice).unwrap(),
            room.stand_up(alice).unwrap(),
        ] {
            for event in events {
                assert!(event.frame.state_version > last);
                last = event.frame.state_version;
            }
        }
    }

    #[test]
    fn test_eligible_seats_skips_busted() {
        let (mut room, host_id) = new_room();
        let alice = join(&mut room, "alice");
        room.sit_down(host_id, 0).unwrap();
        room.sit_down(alice, 3).unwrap();
        assert_eq!(room.eligible_seats(), vec![0, 3]);
        let p = room.player_mut(&alice).unwrap();
        p.chips = 0;
        p.status = PlayerStatus::Eliminated;
        assert_eq!(room.eligible_seats(), vec![0]);
    }
}
