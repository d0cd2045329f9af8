//! Server: namespace registry and the per-connection receive loop.
//!
//! One task per physical connection drives [`Server::serve`]; all dispatch
//! for that connection's inbound packets runs synchronously on that task, so
//! a slow handler stalls only its own connection's reads. Sends may originate
//! from any task and are serialized per destination connection by the
//! transport's write lock.
//!
//! Per (namespace, socket id) pair the loop tracks a state machine of
//! unconnected → connected → disconnected, with no way back: the first
//! packet naming a pair admits the socket into its namespace, and when the
//! transport fails, every pair ever seen on the connection gets exactly one
//! synthesized disconnection.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::caller::EventHandler;
use crate::namespace::Namespace;
use crate::packet::{IntoArgs, CONNECTION, DISCONNECTION};
use crate::socket::{Socket, SocketState};
use crate::transport::{Transport, WsTransport};
use crate::types::GaleError;

/// Root of all shared state: the namespace map. Create one per deployment.
pub struct Server {
    namespaces: tokio::sync::RwLock<HashMap<String, Arc<Namespace>>>,
}

impl Server {
    /// Creates a server with its root namespace already in place.
    pub fn new() -> Arc<Self> {
        let mut namespaces = HashMap::new();
        namespaces.insert(String::new(), Namespace::new(""));
        Arc::new(Self {
            namespaces: tokio::sync::RwLock::new(namespaces),
        })
    }

    /// `""` and `"/"` are two spellings of the root namespace.
    fn normalize(name: &str) -> &str {
        if name == "/" {
            ""
        } else {
            name
        }
    }

    /// Get-or-create the namespace at `name`. `of("")` and `of("/")` return
    /// the same instance. Namespaces live for the life of the server.
    pub async fn of(&self, name: &str) -> Arc<Namespace> {
        let name = Self::normalize(name);
        {
            let namespaces = self.namespaces.read().await;
            if let Some(ns) = namespaces.get(name) {
                return ns.clone();
            }
        }
        let mut namespaces = self.namespaces.write().await;
        namespaces
            .entry(name.to_string())
            .or_insert_with(|| Namespace::new(name))
            .clone()
    }

    /// Registers an event handler on the root namespace.
    pub async fn on<A, H>(&self, event: &str, handler: H) -> Result<(), GaleError>
    where
        H: EventHandler<A>,
    {
        self.of("").await.on(event, handler).await
    }

    /// Sets the root namespace's connect callback.
    pub async fn on_connect<F, Fut>(&self, handler: F)
    where
        F: Fn(Arc<Socket>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.of("").await.on_connect(handler).await;
    }

    /// Sets the root namespace's disconnect callback.
    pub async fn on_disconnect<F, Fut>(&self, handler: F)
    where
        F: Fn(Arc<Socket>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.of("").await.on_disconnect(handler).await;
    }

    /// Broadcasts `event` to every socket in the root namespace.
    pub async fn emit(&self, event: &str, args: impl IntoArgs) -> Result<(), GaleError> {
        self.of("").await.emit(event, args).await
    }

    /// Drives one connection until its transport fails, then synthesizes
    /// disconnects for every (namespace, socket) pair the connection touched.
    pub async fn serve(&self, transport: Arc<dyn Transport>) {
        // namespace name -> socket id -> socket, for disconnect synthesis.
        let mut seen: HashMap<String, HashMap<String, Arc<Socket>>> = HashMap::new();

        loop {
            let packet = match transport.next_packet().await {
                Ok(packet) => packet,
                Err(err) => {
                    tracing::debug!(error = %err, "connection receive loop ended");
                    break;
                }
            };

            let ns = self.of(&packet.namespace).await;
            let sockets = seen.entry(ns.name().to_string()).or_default();
            let socket = if let Some(socket) = sockets.get(&packet.socket) {
                socket.clone()
            } else {
                let socket = Socket::new(packet.socket.clone(), ns.clone(), transport.clone());
                sockets.insert(packet.socket.clone(), socket.clone());
                ns.add_socket(&socket).await;
                socket
            };

            match packet.event.as_str() {
                // The first packet for the pair already admitted the socket.
                CONNECTION => {}
                // Peer-initiated teardown for this pair only.
                DISCONNECTION => ns.remove_socket(&socket).await,
                _ => {
                    if socket.state() == SocketState::Disconnected {
                        tracing::debug!(
                            namespace = %ns.name(),
                            socket = %socket.id(),
                            event = %packet.event,
                            "dropping packet for disconnected socket"
                        );
                        continue;
                    }
                    ns.dispatch(&packet).await;
                    socket.dispatch(&packet).await;
                }
            }
        }

        for socket in seen.values().flat_map(HashMap::values) {
            socket.namespace().remove_socket(socket).await;
        }
    }

    /// Accept loop: upgrades each inbound TCP connection to a websocket and
    /// serves it on its own task.
    pub async fn listen(self: &Arc<Self>, addr: &str) -> Result<(), GaleError> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "gale server listening");

        while let Ok((stream, peer)) = listener.accept().await {
            let server = self.clone();
            tokio::spawn(async move {
                match WsTransport::accept(stream).await {
                    Ok(transport) => server.serve(Arc::new(transport)).await,
                    Err(err) => {
                        tracing::warn!(peer = %peer, error = %err, "websocket handshake failed");
                    }
                }
            });
        }

        Ok(())
    }
}
