//! Server-side socket: the identity of one (connection, namespace) pair.
//!
//! A socket owns its send path (the shared transport of its connection),
//! its own handler registry independent of the namespace's, and the set of
//! rooms it has joined. [`Socket::emit`] is a unicast to the remote peer;
//! use [`Socket::to`] for room broadcast — the two must not be confused.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::caller::{EventHandler, Registry};
use crate::namespace::Namespace;
use crate::packet::{IntoArgs, Packet, CONNECTION, DISCONNECT, DISCONNECTION};
use crate::room::Room;
use crate::transport::Transport;
use crate::types::GaleError;

/// Lifecycle state of a socket. A disconnected socket never reconnects; a
/// reappearing peer gets a fresh socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    /// The socket is live and may send and receive events.
    Connected,
    /// Terminal: the owning connection has gone away.
    Disconnected,
}

/// One (connection, namespace) identity.
pub struct Socket {
    id: String,
    namespace: Arc<Namespace>,
    transport: Arc<dyn Transport>,
    registry: Registry,
    joined: Mutex<HashSet<String>>,
    disconnected: AtomicBool,
}

impl Socket {
    pub(crate) fn new(
        id: impl Into<String>,
        namespace: Arc<Namespace>,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            namespace,
            transport,
            registry: Registry::new(),
            joined: Mutex::new(HashSet::new()),
            disconnected: AtomicBool::new(false),
        })
    }

    /// The socket's globally unique identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The namespace this socket belongs to.
    pub fn namespace(&self) -> &Arc<Namespace> {
        &self.namespace
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SocketState {
        if self.disconnected.load(Ordering::SeqCst) {
            SocketState::Disconnected
        } else {
            SocketState::Connected
        }
    }

    /// Flips the socket into its terminal state. Returns `true` on the
    /// first call only, which is what keeps disconnect delivery exactly-once.
    pub(crate) fn mark_disconnected(&self) -> bool {
        !self.disconnected.swap(true, Ordering::SeqCst)
    }

    /// Registers an event handler on this socket's own registry,
    /// independent of the namespace's. Reserved lifecycle names are
    /// rejected; they never live in a generic registry.
    pub async fn on<A, H>(&self, event: &str, handler: H) -> Result<(), GaleError>
    where
        H: EventHandler<A>,
    {
        if event == CONNECTION || event == DISCONNECTION || event == DISCONNECT {
            return Err(GaleError::ReservedEvent(event.to_string()));
        }
        self.registry.on(event, handler).await;
        Ok(())
    }

    /// Joins `room` in this socket's namespace.
    ///
    /// The local joined-room set and the room's membership are updated under
    /// one lock so the two can never diverge.
    pub async fn join(self: &Arc<Self>, room: &str) {
        let mut joined = self.joined.lock().await;
        self.namespace.room(room).await.join(self.clone()).await;
        joined.insert(room.to_string());
    }

    /// Leaves `room`. Idempotent.
    pub async fn leave(self: &Arc<Self>, room: &str) {
        let mut joined = self.joined.lock().await;
        if joined.remove(room) {
            self.namespace.room(room).await.leave(self).await;
        }
    }

    /// Leaves every joined room. Used during disconnect teardown.
    pub(crate) async fn leave_all(self: &Arc<Self>) {
        let mut joined = self.joined.lock().await;
        for room in joined.iter() {
            self.namespace.room(room).await.leave(self).await;
        }
        joined.clear();
    }

    /// Names of the rooms this socket is currently in.
    pub async fn joined_rooms(&self) -> Vec<String> {
        let joined = self.joined.lock().await;
        joined.iter().cloned().collect()
    }

    /// A broadcast handle for `room` in this socket's namespace.
    pub async fn to(&self, room: &str) -> Arc<Room> {
        self.namespace.room(room).await
    }

    /// Sends `event` to this socket's remote peer only (unicast).
    pub async fn emit(&self, event: &str, args: impl IntoArgs) -> Result<(), GaleError> {
        self.emit_values(event, args.into_args()?).await
    }

    pub(crate) async fn emit_values(&self, event: &str, args: Vec<Value>) -> Result<(), GaleError> {
        let packet = Packet::new(self.namespace.name(), self.id.clone(), event, args);
        self.transport.send(packet).await
    }

    pub(crate) async fn dispatch(&self, packet: &Packet) {
        self.registry.dispatch(packet).await;
    }
}
