use thiserror::Error;

/// Errors produced by the gale messaging layer.
///
/// Transport-level failures are fatal for their connection: the owning
/// receive loop terminates and every socket seen on that connection gets a
/// disconnection notification. Everything else is reported to the caller of
/// the operation that failed and leaves the connection running.
#[derive(Debug, Error)]
pub enum GaleError {
    /// The transport saw an I/O failure or a close frame earlier and refuses
    /// further traffic.
    #[error("transport is closed")]
    TransportClosed,

    /// Websocket-level failure from the underlying connection.
    #[error("websocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),

    /// A packet could not be encoded or decoded as JSON.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// A reserved lifecycle event name was passed to a generic `on`
    /// registration. Reserved events bind through their dedicated methods
    /// (`on_connect`, `on_disconnect`), never through the generic registry.
    #[error("\"{0}\" is a reserved lifecycle event, use its dedicated registration method")]
    ReservedEvent(String),

    /// Failure while binding or accepting on the listen socket.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The system random source failed while generating a socket id.
    #[error("random source failure: {0}")]
    Random(String),
}
