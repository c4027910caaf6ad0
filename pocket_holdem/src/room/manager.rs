//! Process-wide room registry.
//!
//! The registry is the only globally shared structure: it is touched on
//! room creation, lookup and teardown, always in short critical sections.
//! Everything inside a room goes through that room's serial executor.

use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc, oneshot};

use crate::game::constants::ROOM_ID_SPACE;
use crate::game::entities::{ConnectionId, Nickname, PlayerId};
use crate::net::errors::GameError;
use crate::net::messages::Frame;
use crate::room::actor::{RoomActor, RoomHandle};
use crate::room::config::{RoomConfig, RoomOverrides};
use crate::room::messages::{JoinReply, RoomCommand, RoomSummary};
use crate::room::state::Room;

/// Spawns and tracks room actors. Rooms remove themselves from the
/// registry when their last member leaves.
pub struct RoomManager {
    rooms: Arc<RwLock<HashMap<String, RoomHandle>>>,
    default_config: RoomConfig,
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

impl RoomManager {
    pub fn new(default_config: RoomConfig) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            default_config,
        }
    }

    /// Create a room, spawn its actor, and return the handle plus the
    /// minted host player id. The creating connection is subscribed
    /// before the actor starts, so it receives the `room_created` frame.
    pub async fn create_room(
        &self,
        host_nickname: Nickname,
        overrides: &RoomOverrides,
        connection: ConnectionId,
        subscriber: mpsc::Sender<Frame>,
    ) -> Result<(RoomHandle, String, PlayerId), GameError> {
        let config = overrides.apply(&self.default_config);
        config
            .validate()
            .map_err(|reason| GameError::InvalidConfig { reason })?;

        let mut rooms = self.rooms.write().await;
        let room_id = Self::allocate_room_id(&rooms);
        let (room, host_id, events) =
            Room::create(room_id.clone(), config, host_nickname, connection);
        let (actor, handle) = RoomActor::new(
            room,
            self.rooms.clone(),
            events,
            (connection, subscriber),
        );
        rooms.insert(room_id.clone(), handle.clone());
        drop(rooms);

        tokio::spawn(actor.run());
        log::info!("created room {room_id}");
        Ok((handle, room_id, host_id))
    }

    /// Join or reconnect to a room by id.
    pub async fn join_room(
        &self,
        room_id: &str,
        nickname: Nickname,
        connection: ConnectionId,
        existing_player_id: Option<PlayerId>,
        subscriber: mpsc::Sender<Frame>,
    ) -> Result<(RoomHandle, JoinReply), GameError> {
        let handle = self.get(room_id).await.ok_or(GameError::RoomNotFound)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        handle
            .send(RoomCommand::Join {
                nickname: nickname.to_string(),
                connection_id: connection,
                existing_player_id,
                subscriber,
                reply: reply_tx,
            })
            .await
            .map_err(|_| GameError::RoomNotFound)?;
        let reply = reply_rx.await.map_err(|_| GameError::RoomNotFound)??;
        Ok((handle, reply))
    }

    pub async fn get(&self, room_id: &str) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).cloned()
    }

    pub async fn room_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.len()
    }

    /// Diagnostic snapshot of every live room.
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        let handles: Vec<RoomHandle> = {
            let rooms = self.rooms.read().await;
            rooms.values().cloned().collect()
        };
        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            let (reply_tx, reply_rx) = oneshot::channel();
            if handle
                .send(RoomCommand::Summary { reply: reply_tx })
                .await
                .is_ok()
                && let Ok(summary) = reply_rx.await
            {
                summaries.push(summary);
            }
        }
        summaries
    }

    /// Allocate a 6-digit decimal id unique among live rooms.
    fn allocate_room_id(rooms: &HashMap<String, RoomHandle>) -> String {
        let mut rng = rand::rng();
        loop {
            let id = format!("{:06}", rng.random_range(0..ROOM_ID_SPACE));
            if !rooms.contains_key(&id) {
                return id;
            }
        }
    }
}
