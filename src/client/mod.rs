//! Client-side socket: the symmetric end of the wire.
//!
//! A [`ClientSocket`] carries its own generated identity, its own handler
//! registry, and a read loop that dispatches inbound packets exactly the way
//! the server side does. The reserved local event `disconnect` binds through
//! [`ClientSocket::on_disconnect`] (a niladic callback in a dedicated slot)
//! and fires once when the read loop observes transport failure or close.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::caller::{EventHandler, Registry};
use crate::packet::{IntoArgs, Packet, CONNECTION, DISCONNECT, DISCONNECTION};
use crate::transport::{Transport, WsTransport};
use crate::types::GaleError;

type DisconnectHandler = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// One client connection to a gale server, bound to one namespace.
pub struct ClientSocket {
    id: String,
    namespace: String,
    transport: Arc<dyn Transport>,
    registry: Registry,
    disconnect_slot: RwLock<Option<DisconnectHandler>>,
    disconnected: AtomicBool,
}

impl ClientSocket {
    /// Connects to `url` (`host[:port][/namespace]`), announces itself, and
    /// starts the read loop. Returns once the connection announce is sent.
    pub async fn connect(url: &str) -> Result<Arc<Self>, GaleError> {
        let id = generate_id()?;
        let (host, namespace) = split_host_namespace(url);
        let transport: Arc<dyn Transport> = Arc::new(WsTransport::dial(&host).await?);

        let socket = Arc::new(Self {
            id,
            namespace,
            transport,
            registry: Registry::new(),
            disconnect_slot: RwLock::new(None),
            disconnected: AtomicBool::new(false),
        });

        let reader = socket.clone();
        tokio::spawn(async move {
            loop {
                match reader.transport.next_packet().await {
                    Ok(packet) => reader.registry.dispatch(&packet).await,
                    Err(err) => {
                        tracing::debug!(error = %err, "client receive loop ended");
                        break;
                    }
                }
            }
            reader.fire_disconnect().await;
        });

        socket.emit(CONNECTION, ()).await?;
        Ok(socket)
    }

    /// This socket's generated identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The namespace this socket addresses, `""` for the root.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Registers a handler for events sent from the other end. Reserved
    /// lifecycle names are rejected; bind `disconnect` through
    /// [`Self::on_disconnect`].
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

    /// Sets the niladic disconnect callback, replacing any earlier one. It
    /// fires exactly once, when the read loop ends.
    pub async fn on_disconnect<F, Fut>(&self, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.disconnect_slot.write().await;
        *slot = Some(Arc::new(move || Box::pin(handler())));
    }

    /// Sends `event` to the other end of the socket.
    pub async fn emit(&self, event: &str, args: impl IntoArgs) -> Result<(), GaleError> {
        let packet = Packet::new(
            self.namespace.clone(),
            self.id.clone(),
            event,
            args.into_args()?,
        );
        self.transport.send(packet).await
    }

    /// Closes the underlying transport. The read loop then winds down and
    /// the disconnect callback fires.
    pub async fn close(&self) -> Result<(), GaleError> {
        self.transport.close().await
    }

    async fn fire_disconnect(&self) {
        if self.disconnected.swap(true, Ordering::SeqCst) {
            return;
        }
        let slot = { self.disconnect_slot.read().await.clone() };
        if let Some(handler) = slot {
            handler().await;
        }
    }
}

/// Splits `host[/namespace]` into its parts; the namespace keeps its
/// leading slash so it matches what the server's lookup expects.
fn split_host_namespace(url: &str) -> (String, String) {
    match url.split_once('/') {
        Some((host, ns)) if !ns.is_empty() => (host.to_string(), format!("/{ns}")),
        Some((host, _)) => (host.to_string(), String::new()),
        None => (url.to_string(), String::new()),
    }
}

/// 32 bytes from the system's cryptographic random source, base64url
/// encoded without padding. 43 characters, at least 256 bits of randomness.
fn generate_id() -> Result<String, GaleError> {
    let mut buf = [0u8; 32];
    getrandom::fill(&mut buf).map_err(|err| GaleError::Random(err.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(buf))
}
