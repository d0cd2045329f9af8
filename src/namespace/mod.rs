//! Namespaces: logical sub-channels multiplexed over one connection.
//!
//! A namespace owns its rooms, its generic handler registry, and the two
//! reserved lifecycle slots. The reserved events `connection` and
//! `disconnection` never live in the generic registry: they bind through
//! [`Namespace::on_connect`] and [`Namespace::on_disconnect`], whose
//! signatures fix the callback shape (one socket parameter, no return), and
//! the generic [`Namespace::on`] rejects those names synchronously.
//!
//! Namespaces are created lazily by [`crate::server::Server::of`] and are
//! never torn down.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::caller::{EventHandler, Registry};
use crate::packet::{IntoArgs, Packet, CONNECTION, DISCONNECTION};
use crate::room::{Room, RoomSet};
use crate::socket::Socket;
use crate::types::GaleError;

type LifecycleHandler = Arc<dyn Fn(Arc<Socket>) -> BoxFuture<'static, ()> + Send + Sync>;

/// A named logical channel: rooms, handlers, and connect/disconnect slots.
pub struct Namespace {
    name: String,
    rooms: RoomSet,
    registry: Registry,
    connect_slot: RwLock<Option<LifecycleHandler>>,
    disconnect_slot: RwLock<Option<LifecycleHandler>>,
}

impl Namespace {
    pub(crate) fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            rooms: RoomSet::default(),
            registry: Registry::new(),
            connect_slot: RwLock::new(None),
            disconnect_slot: RwLock::new(None),
        })
    }

    /// The namespace path. The root namespace is named `""`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get-or-create the room named `name`, retained for process lifetime.
    pub async fn room(&self, name: &str) -> Arc<Room> {
        self.rooms.room(name).await
    }

    /// Registers an event handler on this namespace's registry.
    ///
    /// Later registrations for the same event replace earlier ones. The
    /// reserved names `connection` and `disconnection` are rejected with
    /// [`GaleError::ReservedEvent`]; bind them through [`Self::on_connect`]
    /// and [`Self::on_disconnect`].
    pub async fn on<A, H>(&self, event: &str, handler: H) -> Result<(), GaleError>
    where
        H: EventHandler<A>,
    {
        if event == CONNECTION || event == DISCONNECTION {
            return Err(GaleError::ReservedEvent(event.to_string()));
        }
        self.registry.on(event, handler).await;
        Ok(())
    }

    /// Sets the connect lifecycle callback, replacing any earlier one. It
    /// fires at most once per socket, right after the socket has joined its
    /// own-id room and the namespace-wide `""` room.
    pub async fn on_connect<F, Fut>(&self, handler: F)
    where
        F: Fn(Arc<Socket>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.connect_slot.write().await;
        *slot = Some(Arc::new(move |socket| Box::pin(handler(socket))));
    }

    /// Sets the disconnect lifecycle callback, replacing any earlier one. It
    /// fires at most once per socket, after the socket has left every room.
    pub async fn on_disconnect<F, Fut>(&self, handler: F)
    where
        F: Fn(Arc<Socket>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.disconnect_slot.write().await;
        *slot = Some(Arc::new(move |socket| Box::pin(handler(socket))));
    }

    /// Broadcasts `event` to every socket in the namespace.
    pub async fn emit(&self, event: &str, args: impl IntoArgs) -> Result<(), GaleError> {
        self.room("").await.emit_values(event, args.into_args()?).await
    }

    pub(crate) async fn dispatch(&self, packet: &Packet) {
        self.registry.dispatch(packet).await;
    }

    /// Admits a socket into the namespace: auto-joins it to its own-id room
    /// and the namespace-wide room, then runs the connect slot. Called
    /// exactly once per (namespace, socket id) pair, the first time a packet
    /// for this namespace is seen on the socket's connection.
    pub(crate) async fn add_socket(&self, socket: &Arc<Socket>) {
        tracing::debug!(namespace = %self.name, socket = %socket.id(), "socket connected");
        let own_room = socket.id().to_string();
        socket.join(&own_room).await;
        socket.join("").await;

        let slot = { self.connect_slot.read().await.clone() };
        if let Some(handler) = slot {
            handler(socket.clone()).await;
        }
    }

    /// Retires a socket: leaves every room it is in, then runs the
    /// disconnect slot. Guarded so it runs at most once per socket even if
    /// termination is observed more than once.
    pub(crate) async fn remove_socket(&self, socket: &Arc<Socket>) {
        if !socket.mark_disconnected() {
            return;
        }
        tracing::debug!(namespace = %self.name, socket = %socket.id(), "socket disconnected");
        socket.leave_all().await;

        let slot = { self.disconnect_slot.read().await.clone() };
        if let Some(handler) = slot {
            handler(socket.clone()).await;
        }
    }
}
