//! Gale is a socket.io-style event messaging library over websockets.
//!
//! It layers logical sub-channels (namespaces), broadcast groups (rooms),
//! and dynamically-bound event handlers on top of a persistent duplex
//! connection. Handlers are ordinary async closures; their parameters are
//! decoded from the packet's positional JSON arguments at dispatch time.
//!
//! ## Example
//!
//! ```no_run
//! use gale::server::Server;
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = Server::new();
//!
//!     let chat = server.of("/chat").await;
//!     chat.on_connect(|socket| async move {
//!         println!("socket connected: {}", socket.id());
//!
//!         socket.join("lobby").await;
//!
//!         let lobby = socket.to("lobby").await;
//!         socket
//!             .on("message", move |from: String, text: String| {
//!                 let lobby = lobby.clone();
//!                 async move {
//!                     let _ = lobby.emit("message", (from, text)).await;
//!                 }
//!             })
//!             .await
//!             .unwrap();
//!     })
//!     .await;
//!
//!     server.listen("0.0.0.0:3001").await.unwrap();
//! }
//! ```
//!
//! The client side is symmetric:
//!
//! ```no_run
//! use gale::client::ClientSocket;
//!
//! #[tokio::main]
//! async fn main() {
//!     let socket = ClientSocket::connect("localhost:3001/chat").await.unwrap();
//!
//!     socket
//!         .on("message", |from: String, text: String| async move {
//!             println!("{from}: {text}");
//!         })
//!         .await
//!         .unwrap();
//!
//!     socket.emit("message", ("me", "hello")).await.unwrap();
//! }
//! ```

pub mod caller;
pub mod client;
pub mod namespace;
pub mod packet;
pub mod room;
pub mod server;
pub mod socket;
pub mod transport;
pub mod types;

#[cfg(test)]
mod tests;

pub use client::ClientSocket;
pub use namespace::Namespace;
pub use packet::{IntoArgs, Packet, CONNECTION, DISCONNECT, DISCONNECTION};
pub use room::Room;
pub use server::Server;
pub use socket::{Socket, SocketState};
pub use transport::{Transport, WsTransport};
pub use types::GaleError;
