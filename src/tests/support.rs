//! Test doubles shared by the test modules.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::namespace::Namespace;
use crate::packet::Packet;
use crate::socket::Socket;
use crate::transport::Transport;
use crate::types::GaleError;

/// In-memory transport: inbound packets arrive through a channel, outbound
/// packets are recorded. Dropping the sender simulates a transport failure,
/// which is how the disconnect-synthesis tests end a connection.
pub(crate) struct MockTransport {
    inbound: Mutex<mpsc::UnboundedReceiver<Packet>>,
    sent: Mutex<Vec<Packet>>,
    closed: AtomicBool,
    fail_sends: AtomicBool,
}

impl MockTransport {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedSender<Packet>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            inbound: Mutex::new(rx),
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
        });
        (transport, tx)
    }

    /// Makes every later `send` fail, without touching the receive side.
    pub(crate) fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    pub(crate) async fn sent_packets(&self) -> Vec<Packet> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn next_packet(&self) -> Result<Packet, GaleError> {
        let mut inbound = self.inbound.lock().await;
        match inbound.recv().await {
            Some(packet) => Ok(packet),
            None => {
                self.closed.store(true, Ordering::SeqCst);
                Err(GaleError::TransportClosed)
            }
        }
    }

    async fn send(&self, packet: Packet) -> Result<(), GaleError> {
        if self.closed.load(Ordering::SeqCst) || self.fail_sends.load(Ordering::SeqCst) {
            return Err(GaleError::TransportClosed);
        }
        self.sent.lock().await.push(packet);
        Ok(())
    }

    async fn close(&self) -> Result<(), GaleError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A socket wired to its own mock transport, for room and emit tests.
pub(crate) fn test_socket(ns: &Arc<Namespace>, id: &str) -> (Arc<Socket>, Arc<MockTransport>) {
    let (transport, _tx) = MockTransport::new();
    let socket = Socket::new(id, ns.clone(), transport.clone() as Arc<dyn Transport>);
    (socket, transport)
}
