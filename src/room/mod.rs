//! Rooms: named broadcast groups of sockets.
//!
//! A room belongs to one namespace and holds sockets by identity (socket
//! id). Join and leave are idempotent. Broadcast snapshots the membership
//! under a read lock and then sends outside it, so a concurrent join or
//! leave never blocks against an in-flight broadcast; whether a socket
//! racing a broadcast receives it is best-effort by design.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::packet::IntoArgs;
use crate::socket::Socket;
use crate::types::GaleError;

/// A named set of sockets that can be broadcast to.
pub struct Room {
    name: String,
    sockets: RwLock<HashMap<String, Arc<Socket>>>,
}

impl Room {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sockets: RwLock::new(HashMap::new()),
        }
    }

    /// The room's name. The namespace-wide room is named `""`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of sockets currently in the room.
    pub async fn size(&self) -> usize {
        self.sockets.read().await.len()
    }

    /// Whether the socket with `id` is a member.
    pub async fn contains(&self, id: &str) -> bool {
        self.sockets.read().await.contains_key(id)
    }

    /// Adds `socket` to the room. Idempotent.
    ///
    /// Membership is keyed by socket id: if two live sockets ever present
    /// the same id, the later join replaces the earlier member. Generated
    /// ids carry 256 bits of randomness, so this only matters for traffic
    /// that fabricates its own ids.
    pub async fn join(&self, socket: Arc<Socket>) {
        let mut sockets = self.sockets.write().await;
        sockets.insert(socket.id().to_string(), socket);
    }

    /// Removes `socket` from the room. Idempotent.
    pub async fn leave(&self, socket: &Socket) {
        let mut sockets = self.sockets.write().await;
        sockets.remove(socket.id());
    }

    /// Broadcasts `event` to every member, one wire frame per member.
    ///
    /// A failed send to one member never prevents delivery to the rest: the
    /// iteration always completes, each failure is logged, and the first
    /// failure (if any) is returned afterwards.
    pub async fn emit(&self, event: &str, args: impl IntoArgs) -> Result<(), GaleError> {
        self.emit_values(event, args.into_args()?).await
    }

    pub(crate) async fn emit_values(&self, event: &str, args: Vec<Value>) -> Result<(), GaleError> {
        let members: Vec<Arc<Socket>> = {
            let sockets = self.sockets.read().await;
            sockets.values().cloned().collect()
        };

        let mut first_failure = None;
        for socket in members {
            if let Err(err) = socket.emit_values(event, args.clone()).await {
                tracing::warn!(
                    room = %self.name,
                    socket = %socket.id(),
                    error = %err,
                    "broadcast send failed"
                );
                first_failure.get_or_insert(err);
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Lazily-created room map owned by a namespace. Rooms live for the life of
/// the process; an empty room persists until it is used again.
#[derive(Default)]
pub(crate) struct RoomSet {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
}

impl RoomSet {
    /// Get-or-create the room named `name`.
    pub(crate) async fn room(&self, name: &str) -> Arc<Room> {
        {
            let rooms = self.rooms.read().await;
            if let Some(room) = rooms.get(name) {
                return room.clone();
            }
        }
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Room::new(name)))
            .clone()
    }
}
