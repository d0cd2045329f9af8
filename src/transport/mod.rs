//! Framed packet transport over one duplex connection.
//!
//! [`Transport`] is the seam between the messaging core and the physical
//! connection: one blocking "receive next packet" operation, one "send
//! packet" operation, and close. [`WsTransport`] is the websocket
//! implementation, carrying packets as JSON text frames.
//!
//! A transport is per-connection fatal: after its first read or write
//! failure (or an observed close frame) it is permanently closed and every
//! later send fails with [`GaleError::TransportClosed`]. The rest of the
//! design assumes exactly one logical reader per connection; senders may be
//! concurrent and are serialized by the internal write lock, because the
//! underlying stream does not tolerate interleaved writers. One `send` call
//! emits exactly one wire frame.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, connect_async, MaybeTlsStream, WebSocketStream};

use crate::packet::Packet;
use crate::types::GaleError;

/// A duplex framed packet connection.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Receives the next packet, blocking until one arrives. Returns an
    /// error once the connection has failed or closed; that error is final.
    async fn next_packet(&self) -> Result<Packet, GaleError>;

    /// Sends one packet as exactly one wire frame. Fails without touching
    /// the connection once the transport is closed.
    async fn send(&self, packet: Packet) -> Result<(), GaleError>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), GaleError>;
}

/// Websocket transport carrying one JSON-encoded [`Packet`] per text frame.
pub struct WsTransport<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    reader: Mutex<SplitStream<WebSocketStream<T>>>,
    writer: Mutex<SplitSink<WebSocketStream<T>, Message>>,
    closed: AtomicBool,
}

impl<T> WsTransport<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps an already-upgraded websocket stream.
    pub fn new(stream: WebSocketStream<T>) -> Self {
        let (writer, reader) = stream.split();
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            closed: AtomicBool::new(false),
        }
    }

    /// Performs the server-side websocket handshake on a raw stream.
    pub async fn accept(stream: T) -> Result<Self, GaleError> {
        let ws_stream = accept_async(stream).await?;
        Ok(Self::new(ws_stream))
    }

    fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl WsTransport<MaybeTlsStream<TcpStream>> {
    /// Dials `ws://{host}/socket` and returns a ready transport.
    pub async fn dial(host: &str) -> Result<Self, GaleError> {
        let url = format!("ws://{host}/socket");
        let (ws_stream, _) = connect_async(url).await?;
        Ok(Self::new(ws_stream))
    }
}

#[async_trait]
impl<T> Transport for WsTransport<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn next_packet(&self) -> Result<Packet, GaleError> {
        let mut reader = self.reader.lock().await;
        loop {
            match reader.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str(text.as_str()) {
                    Ok(packet) => return Ok(packet),
                    Err(err) => {
                        self.mark_closed();
                        return Err(GaleError::Codec(err));
                    }
                },
                // Control and binary frames are not part of the packet
                // protocol; keep reading.
                Some(Ok(Message::Ping(_)))
                | Some(Ok(Message::Pong(_)))
                | Some(Ok(Message::Binary(_)))
                | Some(Ok(Message::Frame(_))) => continue,
                Some(Ok(Message::Close(_))) | None => {
                    self.mark_closed();
                    return Err(GaleError::TransportClosed);
                }
                Some(Err(err)) => {
                    self.mark_closed();
                    return Err(GaleError::Ws(err));
                }
            }
        }
    }

    async fn send(&self, packet: Packet) -> Result<(), GaleError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(GaleError::TransportClosed);
        }
        let text = serde_json::to_string(&packet)?;
        let mut writer = self.writer.lock().await;
        if let Err(err) = writer.send(Message::Text(text.into())).await {
            self.mark_closed();
            return Err(GaleError::Ws(err));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), GaleError> {
        self.mark_closed();
        let mut writer = self.writer.lock().await;
        writer.send(Message::Close(None)).await.map_err(GaleError::Ws)
    }
}
