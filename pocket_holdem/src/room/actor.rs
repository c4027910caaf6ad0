//! The per-room serial executor.
//!
//! Each room runs in its own task, consuming commands from an mpsc inbox.
//! All state transitions for the room, including timer firings, execute
//! one at a time here; rooms only run concurrently with each other.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tokio::time::{Instant, sleep_until};

use crate::game::entities::ConnectionId;
use crate::net::messages::Frame;
use crate::room::messages::{Outgoing, Recipient, RoomCommand};
use crate::room::state::Room;

/// Capacity of a room's command inbox.
const INBOX_CAPACITY: usize = 128;

/// Capacity of each subscriber's outbound event channel.
pub const SUBSCRIBER_CAPACITY: usize = 64;

/// Cloneable handle for sending commands to a room actor.
#[derive(Clone, Debug)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomCommand>,
    room_id: String,
}

impl RoomHandle {
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Send a command to the room. Fails once the room has been torn down.
    pub async fn send(&self, command: RoomCommand) -> Result<(), RoomClosed> {
        self.sender.send(command).await.map_err(|_| RoomClosed)
    }
}

/// The room no longer exists.
#[derive(Clone, Copy, Debug)]
pub struct RoomClosed;

/// Actor owning one room.
pub struct RoomActor {
    room: Room,
    inbox: mpsc::Receiver<RoomCommand>,
    /// Per-connection outbound channels.
    subscribers: HashMap<ConnectionId, mpsc::Sender<Frame>>,
    /// Registry shared with the manager; the actor removes itself on
    /// teardown.
    registry: Arc<RwLock<HashMap<String, RoomHandle>>>,
    /// Events produced at creation, flushed when the actor starts.
    pending: Vec<Outgoing>,
}

impl RoomActor {
    pub fn new(
        room: Room,
        registry: Arc<RwLock<HashMap<String, RoomHandle>>>,
        pending: Vec<Outgoing>,
        first_subscriber: (ConnectionId, mpsc::Sender<Frame>),
    ) -> (Self, RoomHandle) {
        let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);
        let handle = RoomHandle {
            sender,
            room_id: room.id.clone(),
        };
        let actor = Self {
            room,
            inbox,
            subscribers: HashMap::from([first_subscriber]),
            registry,
            pending,
        };
        (actor, handle)
    }

    /// Run the room's event loop until the last member leaves.
    pub async fn run(mut self) {
        log::info!("room {} starting", self.room.id);
        let pending = std::mem::take(&mut self.pending);
        self.fan_out(pending);

        loop {
            let deadline = self.room.deadline.map(|d| d.at);
            tokio::select! {
                command = self.inbox.recv() => {
                    match command {
                        Some(command) => {
                            if self.handle_command(command) {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    let events = self.room.handle_deadline();
                    self.fan_out(events);
                }
            }
        }

        let mut registry = self.registry.write().await;
        registry.remove(&self.room.id);
        log::info!("room {} closed", self.room.id);
    }

    /// Process one command. Returns true once the room should be torn
    /// down.
    fn handle_command(&mut self, command: RoomCommand) -> bool {
        match command {
            RoomCommand::Join {
                nickname,
                connection_id,
                existing_player_id,
                subscriber,
                reply,
            } => {
                // Subscribe first so the join snapshot reaches the caller.
                self.subscribers.insert(connection_id, subscriber);
                match self
                    .room
                    .join(nickname.into(), connection_id, existing_player_id)
                {
                    Ok((player_id, is_reconnect, events)) => {
                        self.fan_out(events);
                        let _ = reply.send(Ok(crate::room::messages::JoinReply {
                            player_id,
                            is_reconnect,
                        }));
                    }
                    Err(err) => {
                        self.subscribers.remove(&connection_id);
                        let _ = reply.send(Err(err));
                    }
                }
            }
            RoomCommand::SitDown {
                player_id,
                seat_index,
                reply,
            } => {
                let result = self.room.sit_down(player_id, seat_index);
                let _ = reply.send(self.fan_out_result(result));
            }
            RoomCommand::StandUp { player_id, reply } => {
                let result = self.room.stand_up(player_id);
                let _ = reply.send(self.fan_out_result(result));
            }
            RoomCommand::StartGame { player_id, reply } => {
                let result = self.room.start_game(player_id);
                let _ = reply.send(self.fan_out_result(result));
            }
            RoomCommand::Action {
                player_id,
                request,
                reply,
            } => {
                let result = self.room.apply_action(player_id, &request);
                let _ = reply.send(self.fan_out_result(result));
            }
            RoomCommand::Ready { player_id, reply } => {
                let result = self.room.set_ready(player_id);
                let _ = reply.send(self.fan_out_result(result));
            }
            RoomCommand::Kick {
                requester,
                target,
                reply,
            } => {
                let target_connection = self.room.connection_of(&target);
                let result = self.room.kick(requester, target);
                let _ = reply.send(self.fan_out_result(result));
                if let Some(connection) = target_connection {
                    self.subscribers.remove(&connection);
                }
            }
            RoomCommand::Leave { player_id, reply } => {
                let connection = self.room.connection_of(&player_id);
                match self.room.leave(player_id) {
                    Ok((events, emptied)) => {
                        self.fan_out(events);
                        if let Some(connection) = connection {
                            self.subscribers.remove(&connection);
                        }
                        let _ = reply.send(Ok(()));
                        if emptied {
                            return true;
                        }
                    }
                    Err(err) => {
                        let _ = reply.send(Err(err));
                    }
                }
            }
            RoomCommand::Disconnect { connection_id } => {
                self.subscribers.remove(&connection_id);
                let events = self.room.disconnect(connection_id);
                self.fan_out(events);
            }
            RoomCommand::Summary { reply } => {
                let _ = reply.send(self.room.summary());
            }
        }
        false
    }

    fn fan_out_result(
        &mut self,
        result: Result<Vec<Outgoing>, crate::net::errors::GameError>,
    ) -> Result<(), crate::net::errors::GameError> {
        match result {
            Ok(events) => {
                self.fan_out(events);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Deliver events to their audiences. Sends to dead connections are
    /// dropped silently; closed subscriber channels are pruned.
    fn fan_out(&mut self, events: Vec<Outgoing>) {
        for outgoing in events {
            match outgoing.recipient {
                Recipient::All => {
                    let frame = outgoing.frame;
                    let room_id = self.room.id.clone();
                    self.subscribers.retain(|connection, sender| {
                        match sender.try_send(frame.clone()) {
                            Ok(()) => true,
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                log::warn!(
                                    "room {room_id}: subscriber {connection} backlogged, dropping frame"
                                );
                                true
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => false,
                        }
                    });
                }
                Recipient::Connection(connection) => {
                    self.send_to_connection(connection, outgoing.frame);
                }
                Recipient::Player(player_id) => {
                    if let Some(connection) = self.room.connection_of(&player_id) {
                        self.send_to_connection(connection, outgoing.frame);
                    }
                }
            }
        }
    }

    fn send_to_connection(&mut self, connection: ConnectionId, frame: Frame) {
        if let Some(sender) = self.subscribers.get(&connection)
            && sender.try_send(frame).is_err()
        {
            self.subscribers.remove(&connection);
        }
    }
}
