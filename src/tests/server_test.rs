use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::packet::{Packet, CONNECTION, DISCONNECTION};
use crate::server::Server;
use crate::tests::support::MockTransport;
use crate::transport::Transport;
use crate::types::GaleError;

async fn run_connection(
    server: &Arc<Server>,
    transport: Arc<MockTransport>,
) -> tokio::task::JoinHandle<()> {
    let server = server.clone();
    tokio::spawn(async move {
        server.serve(transport as Arc<dyn Transport>).await;
    })
}

async fn finish(serve: tokio::task::JoinHandle<()>) {
    timeout(Duration::from_secs(2), serve)
        .await
        .expect("serve loop did not terminate")
        .unwrap();
}

#[tokio::test]
async fn root_namespace_has_two_names() {
    let server = Server::new();
    let bare = server.of("").await;
    let slash = server.of("/").await;

    assert!(Arc::ptr_eq(&bare, &slash));
    assert!(!Arc::ptr_eq(&bare, &server.of("/chat").await));
}

#[tokio::test]
async fn reserved_events_reject_generic_registration() {
    let server = Server::new();
    let ns = server.of("").await;

    let result = ns.on(CONNECTION, || async {}).await;
    assert!(matches!(result, Err(GaleError::ReservedEvent(_))));

    let result = ns.on(DISCONNECTION, || async {}).await;
    assert!(matches!(result, Err(GaleError::ReservedEvent(_))));

    assert!(ns.on("anything-else", || async {}).await.is_ok());
}

#[tokio::test]
async fn connect_fires_once_and_auto_joins_rooms() {
    let server = Server::new();
    let connects = Arc::new(AtomicUsize::new(0));
    let joined = Arc::new(Mutex::new(Vec::new()));

    {
        let connects = connects.clone();
        let joined = joined.clone();
        server
            .on_connect(move |socket| {
                let connects = connects.clone();
                let joined = joined.clone();
                async move {
                    connects.fetch_add(1, Ordering::SeqCst);
                    joined.lock().await.extend(socket.joined_rooms().await);
                }
            })
            .await;
    }

    let (transport, tx) = MockTransport::new();
    let serve = run_connection(&server, transport).await;

    tx.send(Packet::new("", "sock-1", CONNECTION, vec![])).unwrap();
    tx.send(Packet::new("", "sock-1", "ping", vec![])).unwrap();
    drop(tx);
    finish(serve).await;

    assert_eq!(connects.load(Ordering::SeqCst), 1);
    let joined = joined.lock().await;
    assert!(joined.contains(&"".to_string()));
    assert!(joined.contains(&"sock-1".to_string()));
}

#[tokio::test]
async fn dispatch_goes_through_namespace_then_socket_registry() {
    let server = Server::new();
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let ns = server.of("").await;
    {
        let log = log.clone();
        ns.on("ping", move || {
            let log = log.clone();
            async move {
                log.lock().await.push("namespace");
            }
        })
        .await
        .unwrap();
    }
    {
        let log = log.clone();
        ns.on_connect(move |socket| {
            let log = log.clone();
            async move {
                let log = log.clone();
                socket
                    .on("ping", move || {
                        let log = log.clone();
                        async move {
                            log.lock().await.push("socket");
                        }
                    })
                    .await
                    .unwrap();
            }
        })
        .await;
    }

    let (transport, tx) = MockTransport::new();
    let serve = run_connection(&server, transport).await;

    tx.send(Packet::new("", "sock-1", "ping", vec![])).unwrap();
    drop(tx);
    finish(serve).await;

    assert_eq!(*log.lock().await, vec!["namespace", "socket"]);
}

#[tokio::test]
async fn handler_receives_decoded_args_from_the_wire() {
    let server = Server::new();
    let received = Arc::new(Mutex::new(None));

    {
        let received = received.clone();
        server
            .on("add", move |a: i64, b: i64, c: i64| {
                let received = received.clone();
                async move {
                    *received.lock().await = Some((a, b, c));
                }
            })
            .await
            .unwrap();
    }

    let (transport, tx) = MockTransport::new();
    let serve = run_connection(&server, transport).await;

    tx.send(Packet::new(
        "",
        "sock-1",
        "add",
        vec![json!(1), json!(2), json!(3)],
    ))
    .unwrap();
    drop(tx);
    finish(serve).await;

    assert_eq!(*received.lock().await, Some((1, 2, 3)));
}

#[tokio::test]
async fn disconnect_is_synthesized_exactly_once_per_namespace() {
    let server = Server::new();
    let disconnects = Arc::new(AtomicUsize::new(0));

    for name in ["", "/a", "/b"] {
        let ns = server.of(name).await;
        let disconnects = disconnects.clone();
        ns.on_disconnect(move |_socket| {
            let disconnects = disconnects.clone();
            async move {
                disconnects.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;
    }

    let (transport, tx) = MockTransport::new();
    let serve = run_connection(&server, transport).await;

    for name in ["", "/a", "/b"] {
        tx.send(Packet::new(name, "sock-1", "hello", vec![])).unwrap();
    }
    // one pair is torn down early, twice, before the transport dies
    tx.send(Packet::new("/a", "sock-1", DISCONNECTION, vec![]))
        .unwrap();
    tx.send(Packet::new("/a", "sock-1", DISCONNECTION, vec![]))
        .unwrap();
    drop(tx);
    finish(serve).await;

    assert_eq!(disconnects.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn disconnected_socket_never_reconnects() {
    let server = Server::new();
    let pings = Arc::new(AtomicUsize::new(0));
    let connects = Arc::new(AtomicUsize::new(0));

    {
        let pings = pings.clone();
        server
            .on("ping", move || {
                let pings = pings.clone();
                async move {
                    pings.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await
            .unwrap();
    }
    {
        let connects = connects.clone();
        server
            .on_connect(move |_socket| {
                let connects = connects.clone();
                async move {
                    connects.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await;
    }

    let (transport, tx) = MockTransport::new();
    let serve = run_connection(&server, transport).await;

    tx.send(Packet::new("", "sock-1", "ping", vec![])).unwrap();
    tx.send(Packet::new("", "sock-1", DISCONNECTION, vec![]))
        .unwrap();
    tx.send(Packet::new("", "sock-1", "ping", vec![])).unwrap();
    drop(tx);
    finish(serve).await;

    assert_eq!(pings.load(Ordering::SeqCst), 1);
    assert_eq!(connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn disconnect_leaves_every_room_before_the_callback() {
    let server = Server::new();
    let rooms_at_disconnect = Arc::new(Mutex::new(None));

    {
        let rooms_at_disconnect = rooms_at_disconnect.clone();
        server
            .on_connect(|socket| async move {
                socket.join("lobby").await;
            })
            .await;
        server
            .on_disconnect(move |socket| {
                let rooms_at_disconnect = rooms_at_disconnect.clone();
                async move {
                    *rooms_at_disconnect.lock().await = Some(socket.joined_rooms().await);
                }
            })
            .await;
    }

    let (transport, tx) = MockTransport::new();
    let serve = run_connection(&server, transport).await;

    tx.send(Packet::new("", "sock-1", CONNECTION, vec![])).unwrap();
    drop(tx);
    finish(serve).await;

    assert_eq!(*rooms_at_disconnect.lock().await, Some(Vec::new()));
    assert_eq!(server.of("").await.room("lobby").await.size().await, 0);
    assert_eq!(server.of("").await.room("").await.size().await, 0);
}
